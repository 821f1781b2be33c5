//! Test utilities for Atlas

use std::fs;
use std::path::Path;

use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Create a temporary Python project with a package, a relative import, an
/// enum, a config file and some hidden entries.
pub fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write(root, "app/__init__.py", "");
    write(root, "app/models.py", r#"
from enum import Enum


class Color(Enum):
    """Supported colors."""
    RED = 1
    GREEN = 2


class User:
    name: str
    _email: str

    def __init__(self, name: str, email: str = ""):
        self.name = name
        self._email = email
"#);
    write(root, "app/api/handler.py", r#"
from .models import User
import os


async def handle(request) -> dict:
    user = User("x")
    return {"user": user.name}
"#);
    write(root, "config/settings.yaml", "debug: true\n");
    write(root, "docs/README.md", "# Docs\n");
    write(root, "templates/index.html", "<html></html>\n");

    // Empty directory still counts as a folder.
    fs::create_dir_all(root.join("empty")).unwrap();

    // Hidden entries are skipped by the walk.
    write(root, ".git/config", "[core]\n");
    write(root, ".env", "SECRET=1\n");

    temp_dir
}

/// Create the two-file scenario: `src/a.py` defines `foo`, `src/b.py` imports it.
pub fn create_import_pair() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write(root, "src/a.py", "def foo(x: int) -> str:\n    return str(x)\n");
    write(root, "src/b.py", "from src.a import foo\n\n\ndef bar():\n    return foo(1)\n");

    temp_dir
}
