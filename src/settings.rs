use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::error::SetupError;
use crate::fetch::RetryPolicy;
use crate::spotify::{Credentials, Endpoints};

/// Raw values as they arrive from flags or the environment.
///
/// Every field is optional here; [`Settings::resolve`] decides what is
/// required and what falls back to the settings file or a default.
#[derive(Debug, Default, Clone)]
pub struct SettingsArgs {
    pub settings_file: Option<PathBuf>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub git_dir: Option<String>,
    pub period: Option<String>,
}

/// Optional TOML settings file.
///
/// Example TOML:
/// ```toml
/// git_dir = "~/spotify-history"
/// period_minutes = 360
///
/// [spotify]
/// client_id = "..."
/// client_secret = "..."
///
/// [retry]
/// attempts = 5
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    git_dir: Option<String>,
    period_minutes: Option<u64>,
    spotify: SpotifySection,
    retry: RetryPolicy,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpotifySection {
    client_id: Option<String>,
    client_secret: Option<String>,
    #[serde(flatten)]
    endpoints: Endpoints,
}

/// Effective process settings.
#[derive(Clone)]
pub struct Settings {
    client_id: Option<String>,
    client_secret: Option<String>,
    pub repo_dir: PathBuf,
    /// Zero means a single run.
    pub period: Duration,
    pub endpoints: Endpoints,
    pub retry: RetryPolicy,
}

impl Settings {
    /// Merge defaults, the settings file, and flags/environment (in
    /// increasing precedence).
    ///
    /// Credentials are not checked here, so commands that never talk to the
    /// API work without them; see [`Settings::credentials`].
    ///
    /// # Errors
    /// - The settings file can't be read or parsed.
    /// - No repository directory is given anywhere.
    /// - The directory starts with `~` and `HOME` is unset.
    /// - The period isn't a non-negative whole number of minutes.
    pub fn resolve(args: SettingsArgs) -> Result<Self, SetupError> {
        let file = match &args.settings_file {
            Some(path) => read_settings_file(path)?,
            None => SettingsFile::default(),
        };

        let raw_dir = non_empty(args.git_dir)
            .or(non_empty(file.git_dir))
            .ok_or(SetupError::MissingRepoDir)?;
        let repo_dir = expand_home(&raw_dir, || env::var_os("HOME"))?;

        let minutes = match non_empty(args.period) {
            Some(raw) => parse_period(&raw)?,
            None => file.period_minutes.unwrap_or(0),
        };

        Ok(Self {
            client_id: non_empty(args.client_id).or(non_empty(file.spotify.client_id)),
            client_secret: non_empty(args.client_secret)
                .or(non_empty(file.spotify.client_secret)),
            repo_dir,
            period: Duration::from_secs(minutes.saturating_mul(60)),
            endpoints: file.spotify.endpoints,
            retry: file.retry,
        })
    }

    /// The client-credentials pair.
    ///
    /// # Errors
    /// [`SetupError::MissingCredentials`] naming the first missing variable.
    pub fn credentials(&self) -> Result<Credentials, SetupError> {
        let client_id = self
            .client_id
            .clone()
            .ok_or(SetupError::MissingCredentials("SPOTIFY_ID"))?;
        let client_secret = self
            .client_secret
            .clone()
            .ok_or(SetupError::MissingCredentials("SPOTIFY_SECRET"))?;
        Ok(Credentials {
            client_id,
            client_secret,
        })
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("repo_dir", &self.repo_dir)
            .field("period", &self.period)
            .field("endpoints", &self.endpoints)
            .field("retry", &self.retry)
            .finish()
    }
}

fn read_settings_file(path: &Path) -> Result<SettingsFile, SetupError> {
    let text = fs::read_to_string(path).map_err(|source| SetupError::SettingsRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| SetupError::SettingsParse {
        path: path.to_path_buf(),
        source,
    })
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_period(raw: &str) -> Result<u64, SetupError> {
    raw.trim().parse::<u64>().map_err(|_| SetupError::InvalidPeriod {
        raw: raw.to_string(),
    })
}

/// Expand a leading `~` against `home`. Other paths pass through without
/// looking up `home` at all.
fn expand_home(
    raw: &str,
    home: impl FnOnce() -> Option<OsString>,
) -> Result<PathBuf, SetupError> {
    let rest = match raw.strip_prefix('~') {
        Some("") => "",
        Some(r) if r.starts_with('/') => r.trim_start_matches('/'),
        _ => return Ok(PathBuf::from(raw)),
    };
    let home = home()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| SetupError::UnresolvablePath(raw.to_string()))?;
    let base = PathBuf::from(home);
    Ok(if rest.is_empty() { base } else { base.join(rest) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    fn args(dir: &str) -> SettingsArgs {
        SettingsArgs {
            git_dir: Some(dir.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn repo_dir_is_required() {
        let err = Settings::resolve(SettingsArgs::default()).unwrap_err();
        assert!(matches!(err, SetupError::MissingRepoDir));

        let err = Settings::resolve(args("  ")).unwrap_err();
        assert!(matches!(err, SetupError::MissingRepoDir));
    }

    #[test]
    fn missing_period_means_single_run() {
        let s = Settings::resolve(args("/tmp/history")).unwrap();
        assert_eq!(s.period, Duration::ZERO);
        assert_eq!(s.repo_dir, PathBuf::from("/tmp/history"));
        assert_eq!(s.retry, RetryPolicy::default());
        assert_eq!(s.endpoints, Endpoints::default());
    }

    #[test]
    fn period_is_whole_minutes() {
        let mut a = args("/tmp/history");
        a.period = Some("15".into());
        assert_eq!(
            Settings::resolve(a).unwrap().period,
            Duration::from_secs(15 * 60)
        );

        for bad in ["-1", "1.5", "soon"] {
            let mut a = args("/tmp/history");
            a.period = Some(bad.into());
            let err = Settings::resolve(a).unwrap_err();
            assert!(matches!(err, SetupError::InvalidPeriod { .. }), "{bad}");
        }
    }

    #[test]
    fn credentials_are_checked_lazily() {
        let s = Settings::resolve(args("/tmp/history")).unwrap();
        let err = s.credentials().unwrap_err();
        assert!(matches!(err, SetupError::MissingCredentials("SPOTIFY_ID")));

        let mut a = args("/tmp/history");
        a.client_id = Some("id".into());
        let err = Settings::resolve(a).unwrap().credentials().unwrap_err();
        assert!(matches!(err, SetupError::MissingCredentials("SPOTIFY_SECRET")));
    }

    #[test]
    fn tilde_expands_against_home() {
        let home = || Some(OsString::from("/home/me"));
        assert_eq!(
            expand_home("~/history", home).unwrap(),
            PathBuf::from("/home/me/history")
        );
        assert_eq!(expand_home("~", home).unwrap(), PathBuf::from("/home/me"));
        assert_eq!(expand_home("~other/x", home).unwrap(), PathBuf::from("~other/x"));
        let err = expand_home("~/history", || None).unwrap_err();
        assert!(matches!(err, SetupError::UnresolvablePath(_)));
    }

    #[test]
    #[serial]
    fn tilde_uses_home_from_environment() {
        let td = tempdir().unwrap();
        let prev = env::var_os("HOME");
        unsafe { env::set_var("HOME", td.path()) };

        let s = Settings::resolve(args("~/history"));

        match prev {
            Some(h) => unsafe { env::set_var("HOME", h) },
            None => unsafe { env::remove_var("HOME") },
        }
        assert_eq!(s.unwrap().repo_dir, td.path().join("history"));
    }

    #[test]
    fn settings_file_fills_gaps_and_flags_win() {
        let td = tempdir().unwrap();
        let path = td.path().join("togit.toml");
        fs::write(
            &path,
            r#"
git_dir = "/srv/history"
period_minutes = 60

[spotify]
client_id = "file-id"
client_secret = "file-secret"
api_base = "http://127.0.0.1:9999/v1"

[retry]
attempts = 5
"#,
        )
        .unwrap();

        let s = Settings::resolve(SettingsArgs {
            settings_file: Some(path.clone()),
            client_id: Some("flag-id".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(s.repo_dir, PathBuf::from("/srv/history"));
        assert_eq!(s.period, Duration::from_secs(3600));
        assert_eq!(s.endpoints.api_base, "http://127.0.0.1:9999/v1");
        assert_eq!(s.endpoints.token_url, Endpoints::default().token_url);
        assert_eq!(s.retry.attempts, 5);
        assert_eq!(s.retry.initial_backoff_ms, RetryPolicy::default().initial_backoff_ms);
        let creds = s.credentials().unwrap();
        assert_eq!(creds.client_id, "flag-id");
        assert_eq!(creds.client_secret, "file-secret");
    }

    #[test]
    fn bad_settings_file_is_reported() {
        let td = tempdir().unwrap();
        let missing = td.path().join("nope.toml");
        let err = Settings::resolve(SettingsArgs {
            settings_file: Some(missing),
            ..args("/tmp/history")
        })
        .unwrap_err();
        assert!(matches!(err, SetupError::SettingsRead { .. }));

        let broken = td.path().join("broken.toml");
        fs::write(&broken, "period_minutes = \"often\"\n").unwrap();
        let err = Settings::resolve(SettingsArgs {
            settings_file: Some(broken),
            ..args("/tmp/history")
        })
        .unwrap_err();
        assert!(matches!(err, SetupError::SettingsParse { .. }));
    }
}
