// Purpose: Project inspection helpers.

use std::path::Path;

pub fn check_requirements_txt(project_root: &Path) -> bool {
    project_root.join("requirements.txt").is_file()
}

// A Django settings package has a wsgi.py next to settings.py or a settings/ package.
pub fn is_settings_package(dir: &Path) -> bool {
    if !dir.join("wsgi.py").is_file() {
        return false;
    }
    dir.join("settings.py").is_file() || dir.join("settings").join("__init__.py").is_file()
}

// Single-quotes a word for /bin/sh unless every character is already safe bare.
pub fn shell_quote(word: &str) -> String {
    let bare = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if bare {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
