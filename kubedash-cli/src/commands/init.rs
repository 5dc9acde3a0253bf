//! `kubedash init` command - writes a starter kubedash.yaml

use std::fs;
use std::path::Path;

use kubedash_core::config::DashboardConfig;

const CONFIG_NAMES: [&str; 4] = [
    "kubedash.yaml",
    "kubedash.yml",
    ".kubedash.yaml",
    ".kubedash.yml",
];

const HEADER: &str = "\
# kubedash configuration
# Command-line flags override these values.
";

/// Starter file contents: the defaults, with the current namespace filled in
/// when one was given.
pub fn generate_yaml(namespace: Option<&str>) -> Result<String, String> {
    let config = DashboardConfig {
        namespace: namespace.map(str::to_string),
        ..DashboardConfig::default()
    };
    let body =
        serde_yaml::to_string(&config).map_err(|e| format!("Failed to render config: {}", e))?;
    Ok(format!("{}{}", HEADER, body))
}

/// Run the init command
pub fn run_init(yes: bool, namespace: Option<&str>) -> Result<(), String> {
    let cwd =
        std::env::current_dir().map_err(|e| format!("Failed to get current directory: {}", e))?;
    let path = write_config(&cwd, yes, namespace)?;

    println!("Created: {}\n", path.display());
    println!("Next steps:");
    println!("  1. Review and customize kubedash.yaml");
    println!("  2. Run `kubedash` to start the dashboard");
    Ok(())
}

fn write_config(dir: &Path, yes: bool, namespace: Option<&str>) -> Result<std::path::PathBuf, String> {
    for name in CONFIG_NAMES {
        let path = dir.join(name);
        if path.exists() {
            if !yes {
                return Err(format!(
                    "Config file {} already exists. Use --yes to overwrite.",
                    path.display()
                ));
            }
            println!("Overwriting existing config: {}", path.display());
        }
    }

    let yaml = generate_yaml(namespace)?;
    let output_path = dir.join("kubedash.yaml");
    fs::write(&output_path, yaml).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(output_path)
}
