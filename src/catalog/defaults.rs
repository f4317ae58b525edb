//! 内置默认目录：卖家后台的商品、订单、界面与系统意图

use super::entry::CatalogEntryConfig;
use crate::model::Channel;

/// 手势默认置信度阈值
const GESTURE_MIN_CONFIDENCE: f64 = 0.7;
/// 语音默认置信度阈值
const VOICE_MIN_CONFIDENCE: f64 = 0.5;

/// 默认目录（未配置 `[[catalog]]` 时使用）
pub fn default_catalog() -> Vec<CatalogEntryConfig> {
    vec![
        // === 商品 ===
        CatalogEntryConfig::new("catalog.refresh", "refresh_catalog")
            .description("Update catalog items")
            .response("Refreshing your catalog items...")
            .min_confidence(VOICE_MIN_CONFIDENCE)
            .triggers(&["refresh catalog", "update catalog", "reload items"]),
        CatalogEntryConfig::new("catalog.toggle_status", "toggle_item_status")
            .description("Toggle item active/inactive status")
            .response("Toggling status for item {item_id}")
            .min_confidence(GESTURE_MIN_CONFIDENCE)
            .gestures(&["thumb_up"])
            .requires(&["item_id"])
            .cooldown(Channel::Gesture, 1000),
        CatalogEntryConfig::new("catalog.view_details", "show_item_details")
            .description("Show details for a catalog item")
            .response("Showing details for item {item_id}")
            .requires(&["item_id"]),
        CatalogEntryConfig::new("catalog.search", "search_catalog")
            .description("Search catalog items")
            .response("Searching catalog for: {query}")
            .default_param("query", ""),
        // === 订单 ===
        CatalogEntryConfig::new("orders.view", "show_orders_dashboard")
            .description("Display recent orders")
            .response("Loading your recent orders...")
            .min_confidence(VOICE_MIN_CONFIDENCE)
            .triggers(&["show orders", "view orders", "recent orders"]),
        CatalogEntryConfig::new("orders.refresh", "refresh_orders")
            .description("Refresh orders")
            .response("Refreshing orders..."),
        CatalogEntryConfig::new("orders.complete", "mark_order_complete")
            .description("Mark order as complete")
            .response("Marking order {order_id} as complete")
            .requires(&["order_id"]),
        CatalogEntryConfig::new("orders.refund", "process_order_refund")
            .description("Process order refund")
            .response("Processing refund for order {order_id}")
            .requires(&["order_id"])
            .default_param("reason", "Customer request"),
        CatalogEntryConfig::new("orders.details", "show_order_details")
            .description("Show details for an order")
            .response("Showing details for order {order_id}")
            .requires(&["order_id"]),
        // === 界面 ===
        CatalogEntryConfig::new("ui.select", "ui_select")
            .description("Select table row or UI element")
            .response("Selecting {element_type}")
            .min_confidence(GESTURE_MIN_CONFIDENCE)
            .selection()
            .gestures(&["point_index"])
            .default_param("element_type", "row"),
        CatalogEntryConfig::new("ui.refresh", "refresh_ui")
            .description("Refresh current dashboard")
            .response("Refreshing {target}...")
            .min_confidence(GESTURE_MIN_CONFIDENCE)
            .gestures(&["open_palm"])
            .default_param("target", "current_view")
            .cooldown(Channel::Gesture, 2000),
        CatalogEntryConfig::new("ui.navigate", "navigate")
            .description("Switch between catalog and orders view")
            .response("Navigating to {target}...")
            .min_confidence(GESTURE_MIN_CONFIDENCE)
            .gestures(&["peace_sign"])
            .default_param("target", "toggle_catalog_orders")
            .cooldown(Channel::Gesture, 1500),
        // === 系统 ===
        CatalogEntryConfig::new("system.help", "show_help")
            .description("List available commands")
            .response("Here are the available voice commands...")
            .min_confidence(VOICE_MIN_CONFIDENCE)
            .triggers(&["help", "what can you do"]),
        CatalogEntryConfig::new("system.status", "system_status")
            .description("Report router status")
            .response("Qanat system is running"),
    ]
}
