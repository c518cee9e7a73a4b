use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge, Opts};

macro_rules! register_gauge {
    ($NAME:ident, $help:expr) => {
        pub static $NAME: Lazy<IntGauge> = Lazy::new(|| {
            register_int_gauge!(Opts::new(stringify!($NAME), $help).namespace("lyceum"))
                .unwrap_or_else(|e| panic!("Failed to register gauge {}: {}", stringify!($NAME), e))
        });
    };
}

macro_rules! register_counter {
    ($NAME:ident, $help:expr) => {
        pub static $NAME: Lazy<IntCounter> = Lazy::new(|| {
            register_int_counter!(Opts::new(stringify!($NAME), $help).namespace("lyceum"))
                .unwrap_or_else(|e| {
                    panic!("Failed to register counter {}: {}", stringify!($NAME), e)
                })
        });
    };
}

register_gauge!(CONNECTION_COUNT, "Number of live realtime connections");

register_counter!(EVENT_PUSH_TOTAL, "Events enqueued to live connections");
register_counter!(
    EVENT_DROP_TOTAL,
    "Events dropped because a connection had gone away"
);
