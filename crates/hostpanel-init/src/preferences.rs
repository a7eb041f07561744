//! Interface preferences of the logged-in user.

use hostpanel_config::ConfigStore;

use crate::database::{Database, DatabaseError};
use crate::session::Session;

/// Copies the stored language and theme into the session.
///
/// Only runs for a logged-in user acting as themselves whose session lacks
/// either preference. Each preference falls back on its own to the
/// configured `user_initial_lang` or `user_initial_theme` when the stored
/// value is empty or the user has no row. Returns `true` when the database
/// was queried.
///
/// # Errors
///
/// Returns the [`DatabaseError`] raised by the preferences query.
pub fn apply_user_gui_props(
    session: &mut Session,
    config: &ConfigStore,
    database: &dyn Database,
) -> Result<bool, DatabaseError> {
    let Some(user_id) = session.user_id() else {
        return Ok(false);
    };
    if session.is_impersonated()
        || (session.contains("user_def_lang") && session.contains("user_theme"))
    {
        return Ok(false);
    }

    let props = database.user_gui_props(user_id)?.unwrap_or_default();
    let pick = |stored: Option<String>, setting: &str| {
        stored
            .filter(|value| !value.trim().is_empty())
            .or_else(|| config.text(setting))
            .unwrap_or_default()
    };
    let lang = pick(props.lang, "user_initial_lang");
    let theme = pick(props.layout, "user_initial_theme");
    session.set("user_def_lang", lang);
    session.set("user_theme", theme);
    Ok(true)
}
