use todosync_core::config::SyncSettings;
use todosync_core::util::non_blank;
use todosync_core::DocumentScope;

use crate::cli::ConfigCommands;
use crate::error::CliError;
use crate::settings::Context;

/// Settings changes requested on the command line.
#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub gist_id: Option<String>,
    pub poll_interval: Option<u64>,
    pub debounce_ms: Option<u64>,
    pub user_file: Option<String>,
    pub workspace_file: Option<String>,
    pub api_base_url: Option<String>,
    pub enable: Vec<DocumentScope>,
    pub disable: Vec<DocumentScope>,
}

impl SettingsUpdate {
    pub fn apply(self, settings: &mut SyncSettings) -> Result<(), CliError> {
        if let Some(gist_id) = self.gist_id {
            settings.gist_id = non_blank(Some(gist_id));
        }
        if let Some(secs) = self.poll_interval {
            settings.poll_interval_secs = secs;
        }
        if let Some(ms) = self.debounce_ms {
            settings.debounce_ms = ms;
        }
        for (scope, name) in [
            (DocumentScope::User, self.user_file),
            (DocumentScope::Workspace, self.workspace_file),
        ] {
            if let Some(name) = name {
                match non_blank(Some(name)) {
                    Some(name) => settings.file_names.insert(scope, name),
                    None => settings.file_names.remove(&scope),
                };
            }
        }
        if let Some(url) = self.api_base_url {
            let url = non_blank(Some(url));
            if let Some(url) = url.as_deref() {
                if !todosync_core::util::is_http_url(url) {
                    return Err(CliError::Config(
                        "API base URL must include http:// or https://".to_string(),
                    ));
                }
            }
            settings.api_base_url = url;
        }
        settings.scopes.extend(self.enable);
        for scope in self.disable {
            settings.scopes.remove(&scope);
        }
        Ok(())
    }
}

pub fn run_config(command: ConfigCommands, context: &Context) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&context.settings)?);
            } else {
                for line in format_settings_lines(&context.settings) {
                    println!("{line}");
                }
            }
            Ok(())
        }
        ConfigCommands::Set {
            gist_id,
            poll_interval,
            debounce_ms,
            user_file,
            workspace_file,
            api_base_url,
            enable,
            disable,
        } => {
            let mut settings = context.stored_settings()?;
            SettingsUpdate {
                gist_id,
                poll_interval,
                debounce_ms,
                user_file,
                workspace_file,
                api_base_url,
                enable,
                disable,
            }
            .apply(&mut settings)?;
            context.save_settings(&settings)?;
            println!("{}", context.paths.settings_file.display());
            Ok(())
        }
    }
}

pub fn format_settings_lines(settings: &SyncSettings) -> Vec<String> {
    let scopes = settings
        .enabled_scopes()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        format!("mode:          {}", settings.mode),
        format!(
            "gist id:       {}",
            settings.gist_id().as_deref().unwrap_or("(not set)")
        ),
        format!("poll interval: {}s", settings.poll_interval().as_secs()),
        format!("debounce:      {}ms", settings.debounce_ms),
        format!("scopes:        {scopes}"),
        format!("user file:     {}", settings.file_name(DocumentScope::User)),
        format!(
            "workspace file: {}",
            settings.file_name(DocumentScope::Workspace)
        ),
        format!(
            "api base url:  {}",
            settings
                .api_base_url
                .as_deref()
                .unwrap_or(todosync_core::remote::DEFAULT_API_BASE)
        ),
    ]
}
