use assert_cmd::Command;

#[test]
fn help_lists_every_subcommand() {
    let output = Command::cargo_bin("pawclub")
        .unwrap()
        .arg("--help")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    for subcommand in ["serve", "seed", "grant-role", "revoke-roles", "list-admins"] {
        assert!(stdout.contains(subcommand), "missing {subcommand} in help");
    }
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("pawclub")
        .unwrap()
        .arg("shred-catalog")
        .assert()
        .failure();
}
