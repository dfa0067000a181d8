//! Remote photo sync via rsync.

use std::path::Path;

use crate::error::PluginError;
use crate::plugin::PluginContext;
use crate::process::{run_checked, CommandReport, CommandSpec};

use super::{LOCAL_PATH, REMOTE_HOST, REMOTE_PATH, REMOTE_USER, SYNC_TIMEOUT};

/// Build the rsync invocation.
///
/// The remote path gets a trailing slash when missing so rsync copies the
/// directory's files rather than the directory itself; `--ignore-existing`
/// keeps already-synced photos untouched.
#[must_use]
pub fn rsync_spec(
    timeout_secs: i64,
    user: &str,
    host: &str,
    remote_path: &str,
    local_path: &Path,
) -> CommandSpec {
    let mut source = remote_path.to_string();
    if !source.ends_with('/') {
        source.push('/');
    }
    CommandSpec::new(
        "rsync",
        [
            format!("--timeout={timeout_secs}"),
            "--ignore-existing".to_string(),
            format!("{user}@{host}:{source}"),
            local_path.display().to_string(),
        ],
    )
}

/// Run one synchronous sync pass with the configured settings.
pub fn sync_once(ctx: &PluginContext) -> Result<CommandReport, PluginError> {
    let settings = &ctx.settings;
    let spec = rsync_spec(
        settings.get_int(SYNC_TIMEOUT)?,
        settings.get_str(REMOTE_USER)?,
        settings.get_str(REMOTE_HOST)?,
        settings.get_str(REMOTE_PATH)?,
        settings.get_path(LOCAL_PATH)?,
    );
    run_checked(&ctx.runner, &spec, "rsync")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn spec_appends_trailing_slash_to_remote_path() {
        let spec = rsync_spec(5, "pi", "frame.local", "/photos/shared", &PathBuf::from("/sync"));
        assert_eq!(spec.program, "rsync");
        assert_eq!(
            spec.args,
            vec![
                "--timeout=5",
                "--ignore-existing",
                "pi@frame.local:/photos/shared/",
                "/sync",
            ]
        );
    }

    #[test]
    fn spec_keeps_existing_trailing_slash() {
        let spec = rsync_spec(2, "pi", "frame.local", "/photos/", &PathBuf::from("/sync"));
        assert_eq!(spec.args[2], "pi@frame.local:/photos/");
    }
}
