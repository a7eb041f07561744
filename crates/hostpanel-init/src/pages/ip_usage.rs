//! Reseller IP usage report.

use tracing::debug;

use crate::database::Database;
use crate::events::{Event, HookOutcome};
use crate::identity::{Identity, Role};
use crate::runtime::PanelRuntime;

use super::{PageError, PageOutcome, Template};

const PAGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pages::ip_usage");

/// Page message shown when the reseller has no IP addresses.
pub const IP_USAGE_EMPTY_MESSAGE: &str = "No Ip statistics to be show.";

/// Renders the IP usage statistics of the reseller `identity`.
///
/// Dispatches [`Event::ResellerScriptStart`] first and stops on the first
/// redirect a hook asks for. Each assigned IP gets one `ip_row` holding a
/// `domain_row` per domain and alias created by the reseller, or a single
/// "No records found" row.
///
/// # Errors
///
/// Returns [`PageError::Forbidden`] for non-reseller identities,
/// [`PageError::NotConnected`] when the runtime has no database and
/// [`PageError::Database`] when a query fails.
pub fn render_ip_usage(
    runtime: &mut PanelRuntime,
    identity: &Identity,
    template: &mut dyn Template,
) -> Result<PageOutcome, PageError> {
    if identity.role != Role::Reseller {
        return Err(PageError::Forbidden {
            required: Role::Reseller,
            actual: identity.role,
        });
    }
    let outcomes = runtime.dispatch(Event::ResellerScriptStart, Some(identity));
    if let Some(redirect) = first_redirect(outcomes) {
        return Ok(redirect);
    }

    let theme = runtime.config().text("user_initial_theme").unwrap_or_default();
    template.assign("TR_RESELLER_IP_USAGE_TITLE", runtime.translate("Reseller/IP Usage"));
    template.assign("THEME_COLOR_PATH", &format!("../themes/{theme}"));
    template.assign("THEME_CHARSET", runtime.translate("encoding"));

    let database = runtime.database().ok_or(PageError::NotConnected)?;
    let listed = list_ip_domains(runtime, database, identity.id, template)?;
    let message = (listed == 0).then(|| runtime.translate(IP_USAGE_EMPTY_MESSAGE).to_owned());

    template.assign("TR_DOMAIN_STATISTICS", runtime.translate("Domain statistics"));
    template.assign(
        "TR_IP_RESELLER_USAGE_STATISTICS",
        runtime.translate("Reseller/IP usage statistics"),
    );
    template.assign("TR_DOMAIN_NAME", runtime.translate("Domain Name"));
    template.parse("PAGE", "page");

    let outcomes = runtime.dispatch(Event::ResellerScriptEnd, Some(identity));
    if let Some(redirect) = first_redirect(outcomes) {
        return Ok(redirect);
    }
    Ok(PageOutcome::Rendered { message })
}

fn list_ip_domains(
    runtime: &PanelRuntime,
    database: &dyn Database,
    reseller_id: i64,
    template: &mut dyn Template,
) -> Result<usize, PageError> {
    let ip_ids = database.reseller_ip_ids(reseller_id)?;
    let ips = if ip_ids.is_empty() {
        Vec::new()
    } else {
        database.server_ips(&ip_ids)?
    };
    if ips.is_empty() {
        template.assign("IP_USAGE_STATISTICS", "");
        return Ok(0);
    }

    let total_label = runtime.translate("Total Domains");
    for ip in &ips {
        let domains = database.domains_on_ip(ip.id, reseller_id)?;
        let aliases = database.aliases_on_ip(ip.id, reseller_id)?;
        for name in domains.iter().chain(&aliases) {
            template.assign("DOMAIN_NAME", name);
            template.append("DOMAIN_ROW", "domain_row");
        }

        let count = domains.len() + aliases.len();
        template.assign("IP", &ip.number);
        template.assign("RECORD_COUNT", &format!("{total_label} : {count}"));
        if count == 0 {
            template.assign("DOMAIN_NAME", runtime.translate("No records found"));
            template.append("DOMAIN_ROW", "domain_row");
        }
        template.append("IP_ROW", "ip_row");
        template.assign("DOMAIN_ROW", "");
        debug!(target: PAGE_TARGET, ip = %ip.number, count, "listed ip usage");
    }
    Ok(ips.len())
}

fn first_redirect(outcomes: Vec<HookOutcome>) -> Option<PageOutcome> {
    outcomes.into_iter().find_map(|outcome| match outcome {
        HookOutcome::Redirect { location, message } => {
            Some(PageOutcome::Redirect { location, message })
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::events::{EventContext, Hook, HookCallback};
    use crate::tests::support::{FakeDatabase, PanelSandbox, RecordingTemplate};
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    struct Page {
        _sandbox: PanelSandbox,
        runtime: PanelRuntime,
        template: RecordingTemplate,
    }

    #[fixture]
    fn page() -> Page {
        let sandbox = PanelSandbox::new();
        let runtime = PanelRuntime::new(Context::Normal, &sandbox.config());
        Page {
            _sandbox: sandbox,
            runtime,
            template: RecordingTemplate::ip_usage(),
        }
    }

    fn leave_page(_: &mut EventContext<'_>) -> HookOutcome {
        HookOutcome::Redirect {
            location: "index.php".to_owned(),
            message: "bye".to_owned(),
        }
    }

    fn reseller() -> Identity {
        Identity::new(3, "reseller1", Role::Reseller)
    }

    #[rstest]
    fn lists_domains_and_aliases_per_ip(mut page: Page) {
        let database = FakeDatabase::default()
            .with_reseller_ips(3, &[1, 2])
            .with_server_ip(1, "192.0.2.10")
            .with_server_ip(2, "192.0.2.20")
            .with_domains(1, 3, &["a.test", "b.test"])
            .with_aliases(1, 3, &["alias.test"]);
        page.runtime.database = Some(Box::new(database));

        let outcome = render_ip_usage(&mut page.runtime, &reseller(), &mut page.template)
            .expect("page renders");

        assert_eq!(outcome, PageOutcome::Rendered { message: None });
        assert_eq!(
            page.template.var("IP_ROW"),
            "192.0.2.10 (Total Domains : 3): a.test;b.test;alias.test;\n\
             192.0.2.20 (Total Domains : 0): No records found;\n"
        );
        assert_eq!(page.template.var("DOMAIN_ROW"), "");
    }

    #[rstest]
    fn clears_statistics_without_ips(mut page: Page) {
        page.runtime.database = Some(Box::new(FakeDatabase::default()));
        page.template.assign("IP_USAGE_STATISTICS", "placeholder");

        let outcome = render_ip_usage(&mut page.runtime, &reseller(), &mut page.template)
            .expect("page renders");

        assert_eq!(
            outcome,
            PageOutcome::Rendered {
                message: Some(IP_USAGE_EMPTY_MESSAGE.to_owned())
            }
        );
        assert_eq!(page.template.var("IP_USAGE_STATISTICS"), "");
        assert_eq!(page.template.var("IP_ROW"), "");
    }

    #[rstest]
    fn rejects_non_resellers(mut page: Page) {
        let admin = Identity::new(1, "admin", Role::Admin);
        let error = render_ip_usage(&mut page.runtime, &admin, &mut page.template)
            .expect_err("admins are not resellers");
        assert!(matches!(error, PageError::Forbidden { actual: Role::Admin, .. }));
    }

    #[rstest]
    fn requires_a_connection(mut page: Page) {
        let error = render_ip_usage(&mut page.runtime, &reseller(), &mut page.template)
            .expect_err("no database");
        assert!(matches!(error, PageError::NotConnected));
    }

    #[rstest]
    fn stops_on_a_start_redirect(mut page: Page) {
        page.runtime.database = Some(Box::new(FakeDatabase::default()));
        let redirect: HookCallback = Arc::new(leave_page);
        page.runtime
            .register(&[Event::ResellerScriptStart], &Hook::Callback(redirect));

        let outcome = render_ip_usage(&mut page.runtime, &reseller(), &mut page.template)
            .expect("redirect is not an error");

        assert_eq!(
            outcome,
            PageOutcome::Redirect {
                location: "index.php".to_owned(),
                message: "bye".to_owned(),
            }
        );
        assert_eq!(page.template.var("PAGE"), "");
    }
}
