use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct MyrmPaths {
    pub bucket_dir: PathBuf,
    pub history_file: PathBuf,
    pub settings_file: PathBuf,
    pub audit_log: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<MyrmPaths> {
    let home = required_home_dir()?;
    let data_home = env_or_default_path("MYRM_HOME", home.join(".local/share/myrm"));

    let bucket_dir = data_home.join("bucket");
    let history_file = data_home.join("history.json");
    let settings_file = env_or_default_path(
        "MYRM_SETTINGS_PATH",
        home.join(".config/myrm/settings.json"),
    );
    let audit_log = env_or_default_path("MYRM_AUDIT_LOG", data_home.join("audit.log"));

    Ok(MyrmPaths {
        bucket_dir,
        history_file,
        settings_file,
        audit_log,
    })
}
