use anyhow::Result;

use crate::ui;

pub fn run() -> Result<()> {
    let platform = super::detect_platform()?;

    ui::header("Platform");
    ui::kv("family", &platform.family.to_string());
    ui::kv("distribution", &platform.distro);
    if !platform.distro_like.is_empty() {
        ui::kv("like", &platform.distro_like.join(", "));
    }
    if let Some(version) = &platform.version {
        ui::kv("version", version);
    }
    ui::kv("package manager", &platform.package_manager.to_string());
    ui::kv("architecture", &platform.arch);
    Ok(())
}
