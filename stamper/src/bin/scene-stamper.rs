use scene_stamper::stamp::{self, Target};
use scene_stamper::{CredentialManager, ObsClient, Settings, logging};
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "usage: scene-stamper <source_file>";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let Some(source_file) = std::env::args_os().nth(1) else {
        println!("{USAGE}");
        return ExitCode::FAILURE;
    };
    let source_file = source_file.to_string_lossy().into_owned();

    if let Err(e) = logging::init(&logging::log_path()) {
        eprintln!("{e:?}");
        return ExitCode::FAILURE;
    }

    let settings_path = std::env::var_os("SCENE_STAMPER_SETTINGS")
        .filter(|p| !p.is_empty())
        .map_or_else(
            || PathBuf::from(scene_stamper::settings::DEFAULT_SETTINGS_FILE),
            PathBuf::from,
        );
    let settings = match Settings::load(&settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(
                kind = ?scene_stamper::error::classify(&e),
                "cannot start: {e:?}"
            );
            return ExitCode::FAILURE;
        }
    };

    let clock = ObsClient::new(
        settings.obs_websocket_url.clone(),
        settings.obs_websocket_password.clone(),
        settings.obs_websocket_timeout,
    );
    let auth = CredentialManager::from_settings(&settings, reqwest::Client::new());

    match stamp::run(&clock, &auth, &Target::from(&settings), &source_file).await {
        Ok(stamped) => {
            tracing::info!(
                video_id = %stamped.video.id,
                source = ?stamped.video.source,
                line = %stamped.line,
                "stamped"
            );
            ExitCode::SUCCESS
        }
        Err(failure) => {
            tracing::error!(
                stage = %failure.stage,
                kind = ?failure.kind(),
                "stamp failed: {:?}",
                failure.report
            );
            ExitCode::FAILURE
        }
    }
}
