pub static TEMPLATE_DOCKERFILE: &str = r#"# Generated by contas-deploy. Re-run `contas-deploy generate` after editing the profile.
FROM {{python_image}}

ENV PYTHONDONTWRITEBYTECODE=1 \
    PYTHONUNBUFFERED=1

# Native deps: PDF rendering, OCR, file type sniffing, compilers for wheels
{{#if os_packages}}
RUN apt-get update \
    && apt-get install -y --no-install-recommends{{#each os_packages}} {{this}}{{/each}} \
    && rm -rf /var/lib/apt/lists/*
{{/if}}

WORKDIR /app

{{#if requirements}}
COPY requirements.txt /app/requirements.txt
RUN pip install --no-cache-dir -r requirements.txt
{{/if}}

COPY . /app

{{#if (eq launcher "Binary")}}
COPY {{launcher_path}} /usr/local/bin/contas-deploy
ENV CONTAS_MANAGE_PY={{manage_py_env}}
ENTRYPOINT ["/usr/local/bin/contas-deploy", "start", "--"]
{{else}}
RUN chmod +x /app/entrypoint.sh
ENTRYPOINT ["/app/entrypoint.sh"]
{{/if}}

EXPOSE {{port}}
CMD {{command}}
"#;

pub static TEMPLATE_ENTRYPOINT: &str = r#"#!/bin/sh
# Generated by contas-deploy.
set -e

if [ "${RUN_MIGRATIONS:-}" = "1" ]; then
    python {{manage_py}} migrate --noinput
fi

if [ "${RUN_COLLECTSTATIC:-}" = "1" ]; then
    python {{manage_py}} collectstatic --noinput
fi

exec "$@"
"#;

pub static DOCKER_IGNORE: &str = r#"**/.git
**/.gitignore
**/__pycache__
*.pyc
*.pyo
.env
.venv
venv
media
staticfiles
"#;
