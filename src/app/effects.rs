use crate::app::{ActivationReport, Activator, Page};
use crate::diagram::{self, RenderOutcome};

impl Activator {
    /// Replace every diagram block with a placeholder and arm the theme
    /// toggle. Runs once per page and never suspends.
    ///
    /// A report with zero blocks means the document was not touched.
    pub fn activate(&self, page: &mut Page) -> ActivationReport {
        if page.activated {
            return ActivationReport::default();
        }
        page.activated = true;
        let _scope = crate::perf::scope("app.activate");

        let blocks = diagram::detect(&page.document);
        if blocks.is_empty() {
            tracing::debug!("no diagram blocks on page");
            return ActivationReport::default();
        }
        let placeholders = diagram::replace_all(&mut page.document, &blocks);

        page.toggle = page
            .document
            .select(|e| e.has_class(&self.toggle_class))
            .first()
            .copied();
        tracing::debug!(
            blocks = blocks.len(),
            placeholders = placeholders.len(),
            toggle = page.toggle.is_some(),
            "page activated"
        );
        ActivationReport {
            blocks: blocks.len(),
            placeholders: placeholders.len(),
            ..ActivationReport::default()
        }
    }

    /// Activate `page`, then load the renderer and run the first render pass.
    ///
    /// A load failure is logged; the placeholders keep showing their source.
    pub async fn on_ready(&self, page: &mut Page) -> ActivationReport {
        let mut report = self.activate(page);
        if report.is_idle() {
            return report;
        }
        match self.loader.load().await {
            Ok(renderer) => {
                report.renderer = Some(renderer.name().to_string());
                let outcome =
                    diagram::render_all(&mut page.document, Some(renderer.as_ref())).await;
                report.outcome = Some(outcome);
            }
            Err(err) => {
                tracing::warn!(error = %err, "diagram renderer unavailable");
                crate::perf::log_event("app.load_failed", err.to_string());
                report.load_error = Some(err.to_string());
            }
        }
        report
    }

    /// Re-render after the theme changed, once the toggle's own handlers ran.
    ///
    /// Uses whatever renderer is already loaded and never starts a load.
    pub async fn on_theme_toggle(&self, page: &mut Page) -> RenderOutcome {
        tokio::task::yield_now().await;
        let renderer = self.loader.current();
        diagram::render_all(&mut page.document, renderer.as_deref()).await
    }
}
