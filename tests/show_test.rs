mod common;

use common::Sandbox;
use predicates::prelude::*;

#[test]
fn show_on_empty_history_fails() {
    let sb = Sandbox::new();

    sb.cmd()
        .arg("show")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("history is empty"));
}

#[test]
fn show_lists_removed_items() {
    let sb = Sandbox::new();
    sb.write("one.txt", "1");
    sb.write("two.txt", "2");
    sb.cmd().args(["rm", "one.txt", "two.txt"]).assert().success();

    sb.cmd()
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed on"))
        .stdout(predicate::str::contains("one.txt"))
        .stdout(predicate::str::contains("two.txt"));
}

#[test]
fn show_pages_past_the_end_fail() {
    let sb = Sandbox::new();
    for name in ["a", "b", "c"] {
        sb.write(name, name);
    }
    sb.cmd().args(["rm", "a", "b", "c"]).assert().success();

    sb.cmd()
        .args(["show", "--limit", "10", "--page", "5"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("out of range"));

    sb.cmd()
        .args(["show", "--limit", "2", "--page", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains(" c "))
        .stdout(predicate::str::contains(" a ").not());
}
