//! Text screens for each checkout step.

use std::fmt::Write as _;

use client_core::{router, Action, CheckoutSnapshot, Step};
use shared::{
    catalog::{DEMO_DISCOUNT_CODES, PRODUCTS},
    domain::{format_minor_units, TotalType},
    protocol::{total_amount, CheckoutSession, PaymentInstrument, Total},
};

pub fn render(snapshot: &CheckoutSnapshot, instruments: &[PaymentInstrument]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", snapshot.step);

    match (snapshot.step, snapshot.session.as_ref()) {
        (Step::Catalog, session) => catalog(&mut out, session),
        (Step::Cart, Some(session)) => cart(&mut out, session),
        (Step::Fulfillment, Some(session)) => fulfillment(&mut out, session),
        (Step::Payment, Some(session)) => payment(&mut out, session, instruments),
        (Step::Confirmed, Some(session)) => confirmed(&mut out, session),
        (_, None) => out.push_str("no checkout in progress\n"),
    }
    hints(&mut out, snapshot);

    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "! {error}");
    }
    out
}

fn catalog(out: &mut String, session: Option<&CheckoutSession>) {
    for product in PRODUCTS {
        let _ = writeln!(
            out,
            "  {:<20} {:<22} {:>8}",
            product.id,
            product.title,
            format_minor_units(product.price)
        );
    }
    if let Some(session) = session {
        let count: u32 = session.line_items.iter().map(|li| li.quantity).sum();
        let _ = writeln!(out, "cart: {count} item(s)");
    }
}

fn cart(out: &mut String, session: &CheckoutSession) {
    for line in &session.line_items {
        let amount = line
            .item
            .price
            .map(|price| price * i64::from(line.quantity));
        let _ = writeln!(
            out,
            "  {} x {:<22} {:>8}",
            line.quantity,
            line.item.title,
            amount.map(format_minor_units).unwrap_or_default()
        );
    }

    let codes = session.requested_codes();
    if codes.is_empty() {
        let _ = writeln!(out, "codes: none (try {})", DEMO_DISCOUNT_CODES.join(", "));
    } else {
        let _ = writeln!(out, "codes: {}", codes.join(", "));
    }
    let applied = session
        .discounts
        .as_ref()
        .and_then(|d| d.applied.as_deref())
        .unwrap_or_default();
    for discount in applied {
        let _ = writeln!(
            out,
            "  {:<30} -{}",
            discount.title,
            format_minor_units(discount.amount)
        );
    }
    totals(out, &session.totals);
}

fn fulfillment(out: &mut String, session: &CheckoutSession) {
    let Some(method) = session.shipping_method() else {
        out.push_str("waiting for shipping options\n");
        return;
    };

    out.push_str("destinations:\n");
    for destination in &method.destinations {
        let marker = marker(method.selected_destination_id.as_ref() == Some(&destination.id));
        let _ = writeln!(out, " {marker} {} {}", destination.id, destination.one_line());
    }

    for group in &method.groups {
        let items: Vec<&str> = group
            .line_item_ids
            .iter()
            .filter_map(|id| session.line_items.iter().find(|li| &li.id == id))
            .map(|li| li.item.title.as_str())
            .collect();
        let _ = writeln!(out, "group {} ({}):", group.id, items.join(", "));
        for option in &group.options {
            let marker = marker(group.selected_option_id.as_ref() == Some(&option.id));
            let price = total_amount(&option.totals, &TotalType::Total)
                .map(format_minor_units)
                .unwrap_or_default();
            let _ = writeln!(out, " {marker} {:<10} {:<12} {price}", option.id, option.title);
        }
    }
    totals(out, &session.totals);
}

fn payment(out: &mut String, session: &CheckoutSession, instruments: &[PaymentInstrument]) {
    let selected = session
        .payment
        .as_ref()
        .and_then(|p| p.selected_instrument_id.as_ref());
    for instrument in instruments {
        let marker = marker(selected == Some(&instrument.id));
        let _ = writeln!(out, " {marker} {:<12} {}", instrument.id, instrument.label());
    }
    totals(out, &session.totals);
}

fn confirmed(out: &mut String, session: &CheckoutSession) {
    if let Some(order) = &session.order {
        let _ = writeln!(out, "order {} placed", order.id);
        let _ = writeln!(out, "  {}", order.permalink_url);
    }
    if let Some(total) = session.total(&TotalType::Total) {
        let _ = writeln!(out, "charged {}", format_minor_units(total));
    }
    out.push_str("'restart' to shop again\n");
}

fn totals(out: &mut String, totals: &[Total]) {
    for total in totals {
        let label = total
            .display_text
            .as_deref()
            .unwrap_or_else(|| total.kind.as_str());
        let _ = writeln!(out, "  {:<30} {:>8}", label, format_minor_units(total.amount));
    }
}

const COMMAND_HINTS: &[(Action, &str)] = &[
    (Action::AddToCart, "add <product-id>"),
    (Action::ApplyDiscount, "discount <code>"),
    (Action::ProceedToFulfillment, "checkout"),
    (Action::SelectDestination, "dest <destination-id>"),
    (Action::SelectShippingOption, "ship <group-id> <option-id>"),
    (Action::ProceedToPayment, "next"),
    (Action::CompletePayment, "pay <instrument-id>"),
    (Action::ContinueShopping, "shop"),
    (Action::Back, "back"),
    (Action::Cancel, "cancel"),
    (Action::StartOver, "restart"),
];

/// Commands the current step offers. Without a session only adding is useful.
fn hints(out: &mut String, snapshot: &CheckoutSnapshot) {
    let offered: Vec<&str> = COMMAND_HINTS
        .iter()
        .filter(|(action, _)| router::allows(snapshot.step, *action))
        .filter(|(action, _)| snapshot.session.is_some() || *action == Action::AddToCart)
        .map(|(_, hint)| *hint)
        .collect();
    let _ = writeln!(out, "> {}", offered.join(" | "));
}

fn marker(selected: bool) -> char {
    if selected {
        '*'
    } else {
        ' '
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(step: Step, session: serde_json::Value, error: Option<&str>) -> CheckoutSnapshot {
        CheckoutSnapshot {
            step,
            session: Some(serde_json::from_value(session).expect("session")),
            profile: None,
            error: error.map(str::to_string),
            loading: false,
        }
    }

    #[test]
    fn cart_lists_lines_discounts_and_totals() {
        let screen = render(
            &snapshot(
                Step::Cart,
                json!({
                    "id": "chk_1", "status": "incomplete", "currency": "USD",
                    "line_items": [{ "id": "li_1", "item": { "id": "bouquet_roses", "title": "Bouquet of Red Roses", "price": 3500 }, "quantity": 2 }],
                    "discounts": { "codes": ["10OFF"], "applied": [{ "code": "10OFF", "title": "10% off", "amount": 700 }] },
                    "totals": [{ "type": "subtotal", "amount": 7000 }, { "type": "total", "display_text": "Estimated total", "amount": 6300 }]
                }),
                Some("Unknown discount code"),
            ),
            &[],
        );

        assert!(screen.starts_with("== cart =="));
        assert!(screen.contains("2 x Bouquet of Red Roses"));
        assert!(screen.contains("$70.00"));
        assert!(screen.contains("codes: 10OFF"));
        assert!(screen.contains("-$7.00"));
        assert!(screen.contains("Estimated total"));
        assert!(screen.ends_with("! Unknown discount code\n"));
    }

    #[test]
    fn fulfillment_marks_selected_destination_and_option() {
        let screen = render(
            &snapshot(
                Step::Fulfillment,
                json!({
                    "id": "chk_1", "status": "incomplete", "currency": "USD",
                    "line_items": [{ "id": "li_1", "item": { "id": "gardenias", "title": "Gardenias" }, "quantity": 1 }],
                    "fulfillment": { "methods": [{
                        "id": "ship_1", "type": "shipping",
                        "destinations": [{ "id": "dest_home", "street_address": "123 Main St", "city": "Springfield",
                                           "region": "IL", "address_country": "US", "postal_code": "62701" }],
                        "selected_destination_id": "dest_home",
                        "groups": [{ "id": "grp_li_1", "line_item_ids": ["li_1"],
                                     "options": [{ "id": "std", "title": "Standard", "totals": [{ "type": "total", "amount": 500 }] }],
                                     "selected_option_id": "std" }]
                    }]}
                }),
                None,
            ),
            &[],
        );

        assert!(screen.contains(" * dest_home 123 Main St, Springfield, IL 62701, US"));
        assert!(screen.contains("group grp_li_1 (Gardenias):"));
        assert!(screen.contains(" * std"));
        assert!(screen.contains("$5.00"));
    }

    #[test]
    fn catalog_without_session_lists_every_product() {
        let screen = render(
            &CheckoutSnapshot {
                step: Step::Catalog,
                session: None,
                profile: None,
                error: None,
                loading: false,
            },
            &[],
        );
        assert_eq!(screen.lines().count(), 2 + PRODUCTS.len());
        assert!(screen.contains("orchid_white"));
        assert!(screen.ends_with("> add <product-id>\n"));
    }

    #[test]
    fn empty_cart_suggests_demo_codes_and_offers_cart_commands() {
        let screen = render(
            &snapshot(
                Step::Cart,
                json!({
                    "id": "chk_1", "status": "incomplete", "currency": "USD",
                    "line_items": [{ "id": "li_1", "item": { "id": "gardenias", "title": "Gardenias", "price": 2000 }, "quantity": 1 }]
                }),
                None,
            ),
            &[],
        );

        assert!(screen.contains("codes: none (try 10OFF, WELCOME20, FIXED500)"));
        assert!(screen.contains(
            "> add <product-id> | discount <code> | checkout | shop | cancel | restart\n"
        ));
        assert!(!screen.contains("pay <instrument-id>"));
    }

    #[test]
    fn confirmed_step_offers_only_restart() {
        let screen = render(
            &snapshot(
                Step::Confirmed,
                json!({
                    "id": "chk_1", "status": "completed", "currency": "USD",
                    "order": { "id": "ord_7", "permalink_url": "https://flowers.example/orders/ord_7" },
                    "totals": [{ "type": "total", "amount": 4000 }]
                }),
                None,
            ),
            &[],
        );

        assert!(screen.contains("order ord_7 placed"));
        assert!(screen.contains("charged $40.00"));
        assert!(screen.ends_with("> restart\n"));
    }
}
