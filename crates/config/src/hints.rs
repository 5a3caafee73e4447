#[derive(Debug)]
pub struct ConfigHint {
    pub key: &'static str,
    pub description: &'static str,
}

pub const CONFIG_HINTS: &[ConfigHint] = &[
    ConfigHint {
        key: "shop.base_url",
        description: "Origin of the storefront, e.g. https://shop.example.",
    },
    ConfigHint {
        key: "routes.cart_read",
        description: "Path of the endpoint returning the current cart.",
    },
    ConfigHint {
        key: "routes.cart_add",
        description: "Path of the endpoint adding items to the cart.",
    },
    ConfigHint {
        key: "routes.cart_change",
        description: "Path of the endpoint setting one line's quantity.",
    },
    ConfigHint {
        key: "routes.cart_update",
        description: "Path of the endpoint for bulk quantities and the cart note.",
    },
    ConfigHint {
        key: "widgets.quantity_debounce_ms",
        description: "Quiet period before a quantity change is sent, in milliseconds.",
    },
    ConfigHint {
        key: "widgets.note_debounce_ms",
        description: "Quiet period before a note edit is sent, in milliseconds.",
    },
    ConfigHint {
        key: "widgets.in_flight",
        description: "`supersede` cancels an in-flight change for newer input, `ignore` drops the input.",
    },
    ConfigHint {
        key: "widgets.bus_capacity",
        description: "Cart events buffered per subscriber before older ones are skipped.",
    },
    ConfigHint {
        key: "session.file",
        description: "Session state file; relative paths are resolved against the home directory.",
    },
];

#[must_use]
pub fn hint_for(key: &str) -> Option<&'static ConfigHint> {
    CONFIG_HINTS.iter().find(|hint| hint.key == key)
}
