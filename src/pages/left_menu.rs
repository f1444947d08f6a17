//! Side navigation of the G2 web app
use crate::driver::traits::Actor;
use crate::locator::{xpath, Locator, Query};
use anyhow::Result;

pub struct LeftMenuPage<'a> {
    actor: &'a dyn Actor,
    wait_secs: u64,
}

impl<'a> LeftMenuPage<'a> {
    pub fn new(actor: &'a dyn Actor, wait_secs: u64) -> Self {
        Self { actor, wait_secs }
    }

    fn sidenav() -> Query {
        Query::by_tag("mat-sidenav")
    }

    fn toggle() -> Locator {
        Query::by_tag("button")
            .with_attr("aria-label", "Toggle menu")
            .into()
    }

    fn item(label: &str) -> Locator {
        Self::sidenav()
            .find(Query::by_tag("a").with_normalized_text(label))
            .into()
    }

    fn sub_item(menu: &str, label: &str) -> Locator {
        Locator::xpath(format!(
            "{}/following-sibling::*[1]//a[normalize-space(.)={}]",
            Self::item_xpath(menu),
            xpath::literal(&xpath::normalize_space(label))
        ))
    }

    fn item_xpath(label: &str) -> String {
        Self::sidenav()
            .find(Query::by_tag("a").with_normalized_text(label))
            .to_xpath()
    }

    /// Expand the side navigation unless it is already showing
    pub async fn open_menu(&self) -> Result<()> {
        let opened: Locator = Self::sidenav().with_attr("opened", "true").into();
        if self.actor.grab_number_of_visible_elements(&opened).await? > 0 {
            return Ok(());
        }
        self.actor.click(&Self::toggle(), None).await?;
        let nav: Locator = Self::sidenav().into();
        self.actor.wait_for_element(&nav, self.wait_secs).await
    }

    pub async fn navigate_to(&self, item: &str) -> Result<()> {
        self.open_menu().await?;
        let target = Self::item(item);
        self.actor.wait_for_element(&target, self.wait_secs).await?;
        self.actor.click(&target, None).await
    }

    /// Open `menu`, then pick `sub_item` from the group it expands
    pub async fn navigate_to_sub_item(&self, menu: &str, sub_item: &str) -> Result<()> {
        self.navigate_to(menu).await?;
        let target = Self::sub_item(menu, sub_item);
        self.actor.wait_for_element(&target, self.wait_secs).await?;
        self.actor.click(&target, None).await
    }

    pub async fn verify_active(&self, item: &str) -> Result<()> {
        let active = Locator::xpath(format!(
            "{}[contains(@class, \"active\")]",
            Self::item_xpath(item)
        ));
        self.actor.wait_for_element(&active, self.wait_secs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::dry_run::{ActorCall, DryRunDriver};

    #[tokio::test]
    async fn test_navigate_opens_closed_menu() {
        let driver = DryRunDriver::new().with_default_count(0);
        LeftMenuPage::new(&driver, 3)
            .navigate_to("Requests")
            .await
            .unwrap();

        let calls = driver.calls();
        assert_eq!(
            calls[1],
            ActorCall::Click {
                locator: "xpath=//button[@aria-label=\"Toggle menu\"]".to_string(),
                context: None
            }
        );
        assert_eq!(
            calls.last(),
            Some(&ActorCall::Click {
                locator: "xpath=//mat-sidenav//a[normalize-space(.)=\"Requests\"]".to_string(),
                context: None
            })
        );
    }

    #[tokio::test]
    async fn test_open_menu_skips_toggle_when_open() {
        let driver = DryRunDriver::new();
        LeftMenuPage::new(&driver, 3).open_menu().await.unwrap();
        assert_eq!(driver.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_sub_item_is_scoped_to_menu_group() {
        let driver = DryRunDriver::new();
        LeftMenuPage::new(&driver, 3)
            .navigate_to_sub_item("Settings", "Users")
            .await
            .unwrap();

        let expected = "xpath=//mat-sidenav//a[normalize-space(.)=\"Settings\"]/following-sibling::*[1]//a[normalize-space(.)=\"Users\"]";
        assert!(driver.calls().contains(&ActorCall::Click {
            locator: expected.to_string(),
            context: None
        }));
    }

    #[tokio::test]
    async fn test_verify_active_missing_fails() {
        let driver = DryRunDriver::new();
        let active = Locator::xpath(
            "//mat-sidenav//a[normalize-space(.)=\"Home\"][contains(@class, \"active\")]",
        );
        driver.script_missing(&active);
        assert!(LeftMenuPage::new(&driver, 1).verify_active("Home").await.is_err());
    }
}
