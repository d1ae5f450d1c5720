//! Example: delegated handlers on an offer list
//!
//! Run with `RUST_LOG=pc_events=debug` to see registration and removal.

use pc_dom::Document;
use pc_events::{Binding, Callback};
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let doc = Document::new("https://pro.example/offers");
    let Some(body) = doc.body() else {
        return;
    };
    let list = doc.create_element("ul");
    if body.append_child(&list).is_err() {
        return;
    }

    let select = Callback::new(|offer, event| {
        let index = offer.get_attribute("data-index").unwrap_or_default();
        println!("selected offer #{} ({})", index, event.event_type());
        offer.add_class("selected");
    });
    pc_events::on(&list, "click.offers", Binding::delegated("li.offer", &select));

    let hover = Callback::new(|offer, _| println!("pointer entered {:?}", offer));
    pc_events::on(&list, "mouseenter.offers", Binding::delegated("li.offer", &hover));

    // Offers are rendered after the handlers are bound
    for i in 0..3 {
        let offer = doc.create_element("li");
        offer.add_class("offer");
        let _ = offer.set_attribute("data-index", &i.to_string());
        let _ = list.append_child(&offer);
    }

    for offer in list.children() {
        offer.click();
        pc_events::trigger_with(&offer, "mouseover", [("relatedTarget", &body)]);
    }

    pc_events::off(&list, ".offers");
    println!(
        "handlers left on list: {}",
        pc_events::EventHandler::instance().handler_count(&list)
    );
}
