use tempfile::tempdir;

use super::*;

fn home(dir: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join("home")).expect("temp dir should be utf-8")
}

fn shop() -> Url {
    Url::parse("https://shop.example").expect("valid url")
}

#[test]
fn test_minimal_file_takes_defaults() {
    let config: ConfigFile = toml::from_str(
        r#"
        [shop]
        base_url = "https://shop.example"
        "#,
    )
    .expect("minimal config");

    assert_eq!(config.routes, Routes::default());
    assert_eq!(config.widgets.quantity_debounce, Duration::from_millis(150));
    assert_eq!(config.widgets.note_debounce, Duration::from_millis(200));
    assert_eq!(config.widgets.in_flight, InFlightPolicy::Supersede);
    assert_eq!(config.session.file, DEFAULT_SESSION_FILE);
    assert_eq!(config.settings(), CartSettings::default());
}

#[test]
fn test_widget_section_overrides() {
    let config: ConfigFile = toml::from_str(
        r#"
        [shop]
        base_url = "https://shop.example"

        [routes]
        cart_read = "/api/cart"

        [widgets]
        quantity_debounce_ms = 0
        in_flight = "ignore"
        "#,
    )
    .expect("config with overrides");

    assert_eq!(config.routes.cart_read, "/api/cart");
    assert_eq!(config.routes.cart_add, "/cart/add.js");

    let settings = config.settings();
    assert!(settings.quantity_debounce.is_zero());
    assert_eq!(settings.note_debounce, Duration::from_millis(200));
    assert_eq!(settings.in_flight, InFlightPolicy::Ignore);
}

#[test]
fn test_save_then_load() {
    let dir = tempdir().expect("temp dir");
    let home = home(&dir);
    assert!(!ConfigFile::exists(&home));

    let mut config = ConfigFile::new(shop());
    config.widgets.note_debounce = Duration::from_millis(750);
    config.save(&home).expect("save creates the home directory");
    assert!(ConfigFile::exists(&home));

    let loaded = ConfigFile::load(&home).expect("load");
    assert_eq!(loaded.shop.base_url, shop());
    assert_eq!(loaded.widgets.note_debounce, Duration::from_millis(750));

    let written = std::fs::read_to_string(home.join(CONFIG_FILE)).expect("read back");
    assert!(written.contains("note_debounce_ms = 750"));
}

#[test]
fn test_save_if_changed() {
    let dir = tempdir().expect("temp dir");
    let home = home(&dir);
    let config = ConfigFile::new(shop());

    assert!(config.save_if_changed(&home).expect("first save"));
    assert!(!config.save_if_changed(&home).expect("unchanged"));
}

#[test]
fn test_load_rejects_unusable_bus_capacity() {
    let dir = tempdir().expect("temp dir");
    let home = home(&dir);

    for capacity in ["0", "1000000"] {
        let content = format!(
            "[shop]\nbase_url = \"https://shop.example\"\n\n[widgets]\nbus_capacity = {capacity}\n"
        );
        create_dir_all(&home).expect("create home");
        write(home.join(CONFIG_FILE), content).expect("write config");

        let err = ConfigFile::load(&home).expect_err("capacity out of range");
        assert!(
            format!("{err:?}").contains("widgets.bus_capacity"),
            "unexpected error: {err:?}"
        );
    }
}

#[test]
fn test_load_reports_path() {
    let dir = tempdir().expect("temp dir");
    let home = home(&dir);

    let err = ConfigFile::load(&home).expect_err("no config yet");

    assert!(err.to_string().contains(CONFIG_FILE));
}

#[test]
fn test_session_path_resolution() {
    let mut config = ConfigFile::new(shop());
    let home = Utf8Path::new("/srv/shop");

    assert_eq!(config.session_path(home), "/srv/shop/session.json");

    config.session.file = "/tmp/elsewhere.json".into();
    assert_eq!(config.session_path(home), "/tmp/elsewhere.json");
}

#[test]
fn test_every_editable_key_has_value_and_hint() {
    let config = ConfigFile::new(shop());

    for key in ConfigFile::editable_keys().keys() {
        assert!(config.get_value(key).is_some(), "no value for {key}");
        assert!(hints::hint_for(key).is_some(), "no hint for {key}");
    }

    assert_eq!(
        config.get_value("widgets.in_flight").as_deref(),
        Some("supersede")
    );
    assert_eq!(config.get_value("nope"), None);
}
