pub use crate::{
    client::{ClickerClient, UpgradeOutcome, MINE_PATH, UPGRADE_PATH},
    display::{CounterDisplay, MemoryDisplay, COUNTER_ELEMENT_ID},
    error::{ClientError, DisplayError},
};

#[cfg(target_arch = "wasm32")]
pub use crate::display::DomElement;

mod client;
mod display;
mod error;

#[cfg(target_arch = "wasm32")]
mod browser {
    use {
        wasm_bindgen::prelude::*,
        clicker_core::{UpgradeKind, format_rate},
        crate::{ClickerClient, ClientError, CounterDisplay, DomElement, UpgradeOutcome, COUNTER_ELEMENT_ID},
    };

    const MESSAGE_ELEMENT_ID: &str = "message";

    fn page_client() -> Result<ClickerClient, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window available"))?;
        Ok(ClickerClient::new(window.location().origin()?))
    }

    fn to_js(err: ClientError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }

    /// Button handler: mines a block against the page's own origin and updates `#counter`.
    #[wasm_bindgen]
    pub async fn increment_blocks() -> Result<(), JsValue> {
        page_client()?
            .increment_blocks(&DomElement::new(COUNTER_ELEMENT_ID))
            .await
            .map_err(to_js)
    }

    #[wasm_bindgen]
    pub async fn purchase_upgrade(upgrade_type: String) -> Result<(), JsValue> {
        let kind: UpgradeKind = upgrade_type.parse()
            .map_err(|err: clicker_core::UnknownUpgrade| JsValue::from_str(&err.to_string()))?;
        let message = DomElement::new(MESSAGE_ELEMENT_ID);

        match page_client()?.purchase_upgrade(kind).await.map_err(to_js)? {
            UpgradeOutcome::Purchased(stats) => {
                let updates = [
                    (COUNTER_ELEMENT_ID.to_owned(), stats.blocks.to_string()),
                    ("bpc".to_owned(), stats.bpc.to_string()),
                    ("bps".to_owned(), format_rate(stats.bps)),
                    (format!("level-{kind}"), stats.level.to_string()),
                    (format!("cost-{kind}"), stats.next_cost.to_string()),
                ];
                for (id, text) in updates {
                    DomElement::new(id).set_text(&text).map_err(|err| to_js(err.into()))?;
                }
                message.set_text("").map_err(|err| to_js(err.into()))?;
            },
            UpgradeOutcome::Rejected(rejection) => {
                message.set_text(&rejection.error).map_err(|err| to_js(err.into()))?;
            },
            UpgradeOutcome::Ignored { .. } => {},
        }

        Ok(())
    }
}
