use assert2::{check, let_assert};
use rollup::{ConfigError, FirstWindow, Group, GroupConfig, RawPoint};

#[test]
fn deserialize_from_toml() {
    let_assert!(
        Ok(config) = toml::from_str::<GroupConfig>(
            r#"
            default_step = 30
            obsolete_after_steps = 4
            first_window = "current"
            "#
        )
    );
    check!(config.default_step == 30);
    check!(config.obsolete_after_steps == 4);
    check!(config.flush_lag_divisor == 3);
    check!(config.creation_slack == 3);
    check!(config.first_window == FirstWindow::Current);
}

#[test]
fn empty_toml_is_the_default() {
    let_assert!(Ok(config) = toml::from_str::<GroupConfig>(""));
    check!(config == GroupConfig::default());
    check!(config.first_window == FirstWindow::NextFull);
}

#[test]
fn unknown_fields_are_rejected() {
    let_assert!(Err(err) = toml::from_str::<GroupConfig>("default_stepp = 30"));
    check!(err.to_string().contains("default_stepp"));
}

#[test]
fn builder_validates_the_config() {
    let config = GroupConfig {
        flush_lag_divisor: 0,
        ..Default::default()
    };
    let_assert!(Err(err) = Group::builder().config(config).build());
    check!(
        err == ConfigError::NonPositive {
            field: "flush_lag_divisor",
            value: 0
        }
    );
    check!(err.to_string() == "`flush_lag_divisor` must be greater than zero, got 0");

    let config = GroupConfig {
        creation_slack: -1,
        ..Default::default()
    };
    let_assert!(Err(ConfigError::Negative { field, .. }) = Group::builder().config(config).build());
    check!(field == "creation_slack");
}

#[test]
fn raw_point_from_toml() {
    let_assert!(
        Ok(point) = toml::from_str::<RawPoint>(
            r#"
            endpoint = "host-1"
            metric = "cpu.idle"
            value = 97.5
            timestamp = 1700000000
            aggregation = "AVG"
            tags = { core = "0" }
            "#
        )
    );
    check!(point.step == 0);
    check!(point.key() == "endpoint=host-1;metric=cpu.idle;core=0");
}
