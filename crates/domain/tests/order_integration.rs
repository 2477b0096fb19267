//! Integration tests for the Order aggregate.
//!
//! These tests exercise the public domain API the way the service layer uses it:
//! price lines, build a draft, persist it, then drive the lifecycle.

use chrono::{Duration, Utc};
use common::{OrderId, OrderItemId, ProductId, UserId};
use domain::{
    Money, Order, OrderDraft, OrderError, OrderLine, OrderStatus, Quantity, ShippingAddress,
};

fn money(s: &str) -> Money {
    s.parse().unwrap()
}

fn persist(draft: OrderDraft, order_id: i64) -> Order {
    let mut next = 100;
    draft.into_order(OrderId::new(order_id), || {
        next += 1;
        OrderItemId::new(next)
    })
}

fn two_line_order() -> Order {
    let lines = vec![
        OrderLine::new(
            ProductId::new(1),
            "Widget",
            Quantity::new(2).unwrap(),
            money("10.00"),
        )
        .unwrap(),
        OrderLine::new(
            ProductId::new(2),
            "Gadget",
            Quantity::new(1).unwrap(),
            money("5.50"),
        )
        .unwrap(),
    ];
    let draft = OrderDraft::new(
        UserId::new(7),
        ShippingAddress::new("12 Avenue des Champs").unwrap(),
        lines,
        Utc::now(),
    )
    .unwrap();
    persist(draft, 1)
}

mod totals {
    use super::*;

    #[test]
    fn two_lines_total_25_50() {
        let order = two_line_order();

        assert_eq!(order.total_amount(), money("25.50"));
        assert_eq!(order.total_amount().to_string(), "25.50");
        assert_eq!(order.items()[0].subtotal, money("20.00"));
        assert_eq!(order.items()[1].subtotal, money("5.50"));
        assert_eq!(order.recompute_total().unwrap(), order.total_amount());
    }

    #[test]
    fn repeating_decimal_prices_stay_exact() {
        let lines: Vec<_> = (1..=10)
            .map(|i| {
                OrderLine::new(
                    ProductId::new(i),
                    "Cheap thing",
                    Quantity::new(3).unwrap(),
                    money("0.10"),
                )
                .unwrap()
            })
            .collect();
        let draft = OrderDraft::new(
            UserId::new(1),
            ShippingAddress::new("somewhere").unwrap(),
            lines,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(draft.total_amount(), money("3.00"));
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn forward_path_to_delivered() {
        let mut order = two_line_order();
        let mut now = order.created_at();

        for next in ["CONFIRMED", "SHIPPED", "DELIVERED"] {
            now += Duration::seconds(1);
            order.transition(next, now).unwrap();
        }

        assert_eq!(order.status(), OrderStatus::Delivered);
        assert!(order.is_terminal());
        assert_eq!(order.updated_at(), now);
    }

    #[test]
    fn delivered_then_pending_fails_from_every_prior_status() {
        for prior in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
        ] {
            let mut order = two_line_order();
            order.transition(prior.as_str(), Utc::now()).unwrap();
            order.transition("DELIVERED", Utc::now()).unwrap();

            let err = order.transition("PENDING", Utc::now()).unwrap_err();
            assert!(matches!(
                err,
                OrderError::NotModifiable {
                    status: OrderStatus::Delivered
                }
            ));
        }
    }

    #[test]
    fn cancelled_is_reachable_from_every_non_terminal_status() {
        for prior in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
        ] {
            let mut order = two_line_order();
            order.transition(prior.as_str(), Utc::now()).unwrap();
            let change = order.transition("cancelled", Utc::now()).unwrap();
            assert_eq!(change.from, prior);
            assert_eq!(change.to, OrderStatus::Cancelled);
            assert!(order.ensure_deletable().is_err());
        }
    }
}

mod projection {
    use super::*;

    #[test]
    fn view_serializes_camel_case_fields() {
        let view = two_line_order().to_view();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["userId"], 7);
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["totalAmount"], "25.50");
        assert_eq!(json["shippingAddress"], "12 Avenue des Champs");
        assert!(json["orderDate"].is_string());
        assert!(json["createdAt"].is_string());
        assert!(json["updatedAt"].is_string());

        let items = json["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["productId"], 1);
        assert_eq!(items[0]["productName"], "Widget");
        assert_eq!(items[0]["quantity"], 2);
        assert_eq!(items[0]["unitPrice"], "10.00");
        assert_eq!(items[0]["subtotal"], "20.00");
        assert_eq!(items[1]["id"], 102);
    }
}
