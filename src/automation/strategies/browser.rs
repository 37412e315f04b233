use super::Strategy;
use crate::automation::runner::{FlowContext, Next, Outcome, Step, step};
use crate::automation::tree::UiTree;
use crate::links::is_youtube_watch_url;

pub const CHROME: &str = "com.android.chrome";
pub const FIREFOX: &str = "org.mozilla.firefox";

pub fn url_bar_id(package: &str) -> Option<&'static str> {
    match package {
        CHROME => Some("com.android.chrome:id/url_bar"),
        FIREFOX => Some("org.mozilla.firefox:id/url_bar_title"),
        _ => None,
    }
}

pub fn is_browser(package: &str) -> bool {
    url_bar_id(package).is_some()
}

/// Reads the address bar; only YouTube watch pages are accepted.
pub fn capture_url(tree: &UiTree, package: &str) -> Result<String, &'static str> {
    let view_id = url_bar_id(package).ok_or("Unsupported browser")?;
    let bar = tree
        .find_by_view_id(view_id)
        .first()
        .copied()
        .ok_or("URL bar not found")?;
    let text = tree[bar].text.trim();
    if !is_youtube_watch_url(text) {
        return Err("Not a YouTube watch URL");
    }
    // Address bars usually hide the scheme.
    if text.starts_with("http://") || text.starts_with("https://") {
        Ok(text.to_string())
    } else {
        Ok(format!("https://{text}"))
    }
}

pub struct BrowserUrlBar {
    package: String,
}

impl BrowserUrlBar {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
        }
    }
}

impl Strategy for BrowserUrlBar {
    fn name(&self) -> &'static str {
        "browser-url"
    }

    fn first_step(&self) -> Step {
        let package = self.package.clone();
        step(move |ctx| read_address_bar(ctx, &package))
    }
}

fn read_address_bar(ctx: &mut FlowContext<'_>, package: &str) -> Next {
    let Some(tree) = ctx.snapshot() else {
        return Next::failed("Could not read screen");
    };
    match capture_url(&tree, package) {
        Ok(url) => {
            ctx.toast("URL fetched");
            Next::Done(Outcome::UrlCaptured(url))
        }
        Err(reason) => {
            ctx.toast(reason);
            Next::failed(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::tree::UiNode;

    fn browser(package: &str, bar_id: &str, text: &str) -> UiTree {
        let mut tree = UiTree::new();
        let root = tree.add(None, UiNode::new("FrameLayout").package(package));
        tree.add(Some(root), UiNode::new("EditText").id(bar_id).text(text).package(package));
        tree
    }

    #[test]
    fn captures_watch_urls_from_supported_browsers() {
        let chrome = browser(CHROME, "com.android.chrome:id/url_bar", "youtube.com/watch?v=abc");
        assert_eq!(
            capture_url(&chrome, CHROME),
            Ok("https://youtube.com/watch?v=abc".to_string())
        );

        let firefox = browser(
            FIREFOX,
            "org.mozilla.firefox:id/url_bar_title",
            "https://www.youtube.com/watch?v=x",
        );
        assert_eq!(
            capture_url(&firefox, FIREFOX),
            Ok("https://www.youtube.com/watch?v=x".to_string())
        );
    }

    #[test]
    fn reports_why_nothing_was_captured() {
        let chrome = browser(CHROME, "com.android.chrome:id/url_bar", "youtube.com/@channel");
        assert_eq!(capture_url(&chrome, CHROME), Err("Not a YouTube watch URL"));
        assert_eq!(capture_url(&chrome, FIREFOX), Err("URL bar not found"));
        assert_eq!(capture_url(&chrome, "com.opera.browser"), Err("Unsupported browser"));
    }
}
