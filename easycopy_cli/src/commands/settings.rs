//! Settings commands (show, set, reset)

use crate::config::FileStore;
use crate::settings::{CopyField, CopySettings, SettingsForm, SettingsStore};
use anyhow::{Context, Result};
use console::style;
use std::sync::Arc;

fn open_store() -> Result<SettingsStore> {
    Ok(SettingsStore::new(Arc::new(FileStore::open_default()?)))
}

/// Print which fields are included in copies
pub async fn show() -> Result<()> {
    let settings = open_store()?.load()?;
    print_settings(&settings);
    Ok(())
}

/// Update fields given as `field=true|false` and save the result
pub async fn set(assignments: &[String]) -> Result<()> {
    let store = open_store()?;
    let mut form = SettingsForm::new(store.load().unwrap_or_else(|e| {
        tracing::warn!("Stored settings unreadable, starting from defaults: {:#}", e);
        CopySettings::default()
    }));

    apply_assignments(&mut form, assignments)?;
    let settings = form.settings();
    store.save(&settings)?;

    println!("{}", style("Settings saved.").green());
    print_settings(&settings);
    Ok(())
}

/// Restore and save the default field selection
pub async fn reset() -> Result<()> {
    let settings = CopySettings::default();
    open_store()?.save(&settings)?;

    println!("{}", style("Settings reset to defaults.").green());
    print_settings(&settings);
    Ok(())
}

fn apply_assignments(form: &mut SettingsForm, assignments: &[String]) -> Result<()> {
    for assignment in assignments {
        let (field, value) = assignment
            .split_once('=')
            .with_context(|| format!("Expected FIELD=true|false, got `{}`", assignment))?;

        let field: CopyField = field.trim().parse()?;
        let included: bool = value
            .trim()
            .to_ascii_lowercase()
            .parse()
            .with_context(|| format!("Invalid value for {}: `{}`", field, value))?;

        form.set(field, included);
    }
    Ok(())
}

fn print_settings(settings: &CopySettings) {
    println!();
    println!("{:<18} {:<24} {}", "FIELD", "DESCRIPTION", "COPY");
    println!("{}", "-".repeat(50));
    for field in CopyField::ALL {
        let mark = if settings.get(field) {
            style("yes").green()
        } else {
            style("no").dim()
        };
        println!("{:<18} {:<24} {}", field.as_str(), field.label(), mark);
    }
}
