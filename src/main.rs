use anyhow::Context;

use pawclub_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Pawclub settings")?;
    pawclub_telemetry::init(&settings.telemetry)
        .with_context(|| "failed to initialize telemetry")?;

    tracing::info!(
        env = ?settings.environment,
        store = %settings.store.endpoint,
        "pawclub bootstrap starting"
    );

    pawclub_app::run(settings).await
}
