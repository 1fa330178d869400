use crate::app::{Page, ReadyState};
use crate::diagram::Theme;
use crate::dom::NodeId;

/// Events delivered to a page by its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// The document finished parsing.
    ContentLoaded,
    /// A click on `target`.
    Click { target: NodeId },
    /// The site's theme script switched the theme signal.
    SetTheme(Theme),
    /// The page is going away; stop handling events.
    Close,
}

/// Work the controller has to do for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Detect, transform, load and render.
    Activate,
    /// Re-run the render pass on the existing placeholders.
    Rerender,
    Stop,
}

/// Apply `event` to `page` and decide what follows.
///
/// Only state changes happen here; rendering is left to the caller.
pub fn update(page: &mut Page, event: PageEvent) -> Effect {
    match event {
        PageEvent::ContentLoaded => {
            if page.activated {
                return Effect::None;
            }
            if page.ready_state == ReadyState::Loading {
                page.ready_state = ReadyState::Interactive;
            }
            Effect::Activate
        }
        PageEvent::Click { target } => {
            if page.hits_toggle(target) {
                Effect::Rerender
            } else {
                Effect::None
            }
        }
        PageEvent::SetTheme(theme) => {
            if !theme.apply(&mut page.document) {
                tracing::debug!(theme = theme.as_str(), "page has no element to carry the theme");
            }
            Effect::None
        }
        PageEvent::Close => Effect::Stop,
    }
}
