use std::env;
use std::path::PathBuf;

include!(concat!(env!("OUT_DIR"), "/myrm_env_allowlist.rs"));

fn fallback_dotenv_path(myrm_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(base) = myrm_home {
        return Some(base.join(".env"));
    }
    Some(home_dir?.join(".config/myrm/.env"))
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("MYRM_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

fn unknown_keys<I>(vars: I, allowlist: &[&str]) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = vars
        .into_iter()
        .filter(|key| key.starts_with("MYRM_"))
        .filter(|key| !allowlist.contains(&key.as_str()))
        .collect();
    out.sort();
    out
}

/// `MYRM_*` variables in the environment that nothing in this binary reads.
pub fn unknown_myrm_vars() -> Vec<String> {
    unknown_keys(env::vars().map(|(key, _)| key), GENERATED_MYRM_ENV_ALLOWLIST)
}
