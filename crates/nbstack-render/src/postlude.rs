use nbstack_schema::PackageManager;

/// Cleanup run after a manager's installs, before permissions are fixed.
fn cleanup_commands(manager: PackageManager) -> &'static [&'static str] {
    match manager {
        PackageManager::Conda => &["conda clean --all -f -y"],
        PackageManager::Pip => &[r#"rm -rf "/home/${NB_USER}/.cache/pip""#],
        PackageManager::LabExtension => &[
            "jupyter lab build -y",
            "jupyter lab clean -y",
            "npm cache clean --force",
            r#"rm -rf "/home/${NB_USER}/.cache/yarn""#,
            r#"rm -rf "/home/${NB_USER}/.node-gyp""#,
        ],
    }
}

pub fn fix_permissions_command(path: &str) -> String {
    format!("fix-permissions \"{path}\"")
}

/// The fixed postlude for one install step.
pub fn postlude(manager: PackageManager, fix_permissions: &[String]) -> Vec<String> {
    let mut commands: Vec<String> = cleanup_commands(manager)
        .iter()
        .map(|c| (*c).to_owned())
        .collect();
    commands.extend(fix_permissions.iter().map(|p| fix_permissions_command(p)));
    commands
}
