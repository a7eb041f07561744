//! A malformed panel setting aborts loading instead of being defaulted.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use ortho_config::{OrthoConfig as _, OrthoError};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use hostpanel_config::PanelConfig;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Scratch directory for panel configuration files plus exclusive access to
/// the `HOSTPANEL_*` environment. Variables set through it are removed on
/// drop.
struct Layers {
    dir: TempDir,
    set: Vec<&'static str>,
    _env: MutexGuard<'static, ()>,
}

impl Layers {
    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write panel configuration");
        path
    }

    fn env(&mut self, key: &'static str, value: impl AsRef<std::ffi::OsStr>) {
        // Edition 2024 marks environment mutation unsafe; ENV_LOCK serialises it.
        unsafe { std::env::set_var(key, value) };
        self.set.push(key);
    }

    fn load_with(&self, config: Option<&Path>) -> Result<PanelConfig, std::sync::Arc<OrthoError>> {
        let mut args = vec![OsString::from("hostpanel-init")];
        if let Some(path) = config {
            args.push(OsString::from("--config-path"));
            args.push(path.as_os_str().to_owned());
        }
        PanelConfig::load_from_iter(args)
    }
}

impl Drop for Layers {
    fn drop(&mut self) {
        for key in self.set.drain(..) {
            unsafe { std::env::remove_var(key) };
        }
    }
}

#[fixture]
fn layers() -> Layers {
    let guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    Layers {
        dir: TempDir::new().expect("create temp dir"),
        set: Vec::new(),
        _env: guard,
    }
}

#[rstest]
#[case("debug = \"sometimes\"\n")]
#[case("compress_output = 3\n")]
#[case("timezone = [\"UTC\"]\n")]
#[case("latest_database_revision = -1\n")]
fn mistyped_panel_settings_are_rejected(layers: Layers, #[case] contents: &str) {
    let path = layers.file("hostpanel.toml", contents);

    let result = layers.load_with(Some(&path));

    assert!(result.is_err(), "{contents:?} loaded as {result:?}");
}

#[rstest]
fn broken_cli_and_env_files_are_both_reported(mut layers: Layers) {
    let cli_path = layers.file("cli.toml", "compress_output = true show_compression_size");
    let env_path = layers.file("env.toml", "[debug\n");
    layers.env("HOSTPANEL_CONFIG_PATH", &env_path);

    let error = layers
        .load_with(Some(&cli_path))
        .expect_err("both files are malformed");

    let OrthoError::Aggregate(aggregate) = error.as_ref() else {
        panic!("expected one error per broken layer, got {error:?}");
    };
    let mut reported: Vec<PathBuf> = aggregate
        .iter()
        .filter_map(|err| match err {
            OrthoError::File { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect();
    reported.sort();
    let mut expected = vec![cli_path, env_path];
    expected.sort();
    assert_eq!(reported, expected);
}

#[rstest]
fn unknown_init_scope_is_rejected(mut layers: Layers) {
    layers.env("HOSTPANEL_INIT_SCOPE", "per_thread");

    let result = layers.load_with(None);

    assert!(
        result.is_err(),
        "an unknown guard scope must not fall back silently: {result:?}"
    );
}
