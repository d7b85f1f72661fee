//! On-disk platform layout for tests: a buildpack store, an extension store,
//! an application directory, a platform directory and an `order.toml`.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Platform {
    root: TempDir,
}

impl Platform {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        for dir in ["buildpacks", "extensions", "app", "platform/env", "layers"] {
            fs::create_dir_all(root.path().join(dir)).expect("Failed to create fixture dir");
        }
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn buildpacks_dir(&self) -> PathBuf {
        self.path().join("buildpacks")
    }

    pub fn extensions_dir(&self) -> PathBuf {
        self.path().join("extensions")
    }

    pub fn app_dir(&self) -> PathBuf {
        self.path().join("app")
    }

    pub fn platform_dir(&self) -> PathBuf {
        self.path().join("platform")
    }

    pub fn order_path(&self) -> PathBuf {
        self.path().join("order.toml")
    }

    pub fn group_path(&self) -> PathBuf {
        self.path().join("layers/group.toml")
    }

    pub fn plan_path(&self) -> PathBuf {
        self.path().join("layers/plan.toml")
    }

    fn module_dir(&self, base: PathBuf, id: &str, version: &str) -> PathBuf {
        let dir = base.join(id.replace('/', "_")).join(version);
        fs::create_dir_all(dir.join("bin")).expect("Failed to create module dir");
        dir
    }

    /// A buildpack whose `bin/detect` is the given shell body.
    pub fn buildpack(&self, id: &str, version: &str, api: &str, detect: &str) -> PathBuf {
        let dir = self.module_dir(self.buildpacks_dir(), id, version);
        fs::write(
            dir.join("buildpack.toml"),
            format!("api = \"{api}\"\n\n[buildpack]\nid = \"{id}\"\nversion = \"{version}\"\n"),
        )
        .expect("Failed to write buildpack.toml");
        write_script(&dir.join("bin/detect"), detect);
        dir
    }

    /// A composite buildpack: a descriptor with an order and no executable.
    pub fn composite(&self, id: &str, version: &str, order: &str) -> PathBuf {
        let dir = self.module_dir(self.buildpacks_dir(), id, version);
        fs::write(
            dir.join("buildpack.toml"),
            format!("api = \"0.10\"\n\n[buildpack]\nid = \"{id}\"\nversion = \"{version}\"\n\n{order}"),
        )
        .expect("Failed to write buildpack.toml");
        dir
    }

    /// An extension; without a detect body it relies on `detect/plan.toml`.
    pub fn extension(&self, id: &str, version: &str, detect: Option<&str>, plan: Option<&str>) -> PathBuf {
        let dir = self.module_dir(self.extensions_dir(), id, version);
        fs::write(
            dir.join("extension.toml"),
            format!("api = \"0.10\"\n\n[extension]\nid = \"{id}\"\nversion = \"{version}\"\n"),
        )
        .expect("Failed to write extension.toml");
        if let Some(body) = detect {
            write_script(&dir.join("bin/detect"), body);
        }
        if let Some(plan) = plan {
            fs::create_dir_all(dir.join("detect")).expect("Failed to create detect dir");
            fs::write(dir.join("detect/plan.toml"), plan).expect("Failed to write plan.toml");
        }
        dir
    }

    pub fn order(&self, contents: &str) {
        fs::write(self.order_path(), contents).expect("Failed to write order.toml");
    }

    pub fn platform_env(&self, name: &str, value: &str) {
        fs::write(self.platform_dir().join("env").join(name), value).expect("Failed to write platform env");
    }

    pub fn read_group(&self) -> toml::Table {
        read_table(&self.group_path())
    }

    pub fn read_plan(&self) -> toml::Table {
        read_table(&self.plan_path())
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write detect script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod detect script");
}

fn read_table(path: &Path) -> toml::Table {
    let contents = fs::read_to_string(path).expect("Failed to read output document");
    contents.parse::<toml::Table>().expect("Output is not valid TOML")
}

/// Ids of the `[[group]]` entries, in order.
pub fn group_ids(table: &toml::Table, key: &str) -> Vec<String> {
    table
        .get(key)
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get("id").and_then(|id| id.as_str()).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
