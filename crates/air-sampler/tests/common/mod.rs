use std::sync::Once;

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static SETUP_TRACING: Once = Once::new();

pub fn setup_tracing() {
    SETUP_TRACING.call_once(|| {
        color_eyre::install().unwrap();
        tracing_subscriber::registry()
            .with(ErrorLayer::default())
            .with(tracing_subscriber::fmt::layer().pretty().with_test_writer())
            .init();
    });
}
