use kim::cli::{self, Commands, commands};
use kim::domain::semver::{self, BumpKind};
use kim::domain::{ExecContext, KitchenConfig, Platform, RegistryAuth, Suite};
use kim::infra::Settings;

#[test]
fn test_semver_bumps_reset_lower_segments() {
    let cases = [
        ("1.2.3", BumpKind::Patch, "1.2.4"),
        ("1.2.3", BumpKind::Minor, "1.3.0"),
        ("1.2.3", BumpKind::Major, "2.0.0"),
        ("0.0.0", BumpKind::Patch, "0.0.1"),
        ("1.9", BumpKind::Patch, "1.9.1"),
        ("1.2.3.4", BumpKind::Minor, "1.3.0.4"),
    ];
    for (version, kind, expected) in cases {
        assert_eq!(semver::increment(version, kind), expected, "{version} {kind}");
    }
    assert!(semver::increment_str("1.0.0", "huge").is_err());
}

#[test]
fn test_every_instance_gets_a_scoped_image() {
    let registry = "123.dkr.ecr.eu-west-1.amazonaws.com";
    let settings = Settings::new(Some(registry.into()), None, "/src/lrqdo_docker").unwrap();
    let config = KitchenConfig::new(
        vec![
            Platform::new("buster", Some("debian:buster")),
            Platform::new("centos-7", Some("centos:7")),
        ],
        vec![Suite::new("default"), Suite::new("community")],
    );

    let names: Vec<String> = config.instances().into_iter().map(|i| i.name).collect();
    assert_eq!(
        names,
        vec![
            "default-buster",
            "default-centos-7",
            "community-buster",
            "community-centos-7"
        ]
    );

    for instance in config.instances() {
        let image = settings.image(&instance.platform.name, &instance.suite.name);
        let suffix = format!("-{}-{}:latest", instance.platform.name, instance.suite.name);
        assert!(image.starts_with(&format!("{registry}/ci/cookbooks-lrqdo_docker-")));
        assert!(image.ends_with(&suffix));
    }
}

#[test]
fn test_exec_placeholders_leave_shell_syntax_alone() {
    let context = ExecContext {
        instance: "default-buster".into(),
        suite: "default".into(),
        container_id: Some("abc".into()),
        container_ipaddress: Some("172.17.0.2".into()),
        instance_conf_file: ".kitchen/default-buster.yml".into(),
    };

    let rendered = context
        .render("ping -c1 {container_ipaddress} && echo ${HOME} {suite}")
        .unwrap();
    assert_eq!(rendered, "ping -c1 172.17.0.2 && echo ${HOME} default");
}

#[test]
fn test_ecr_token_becomes_docker_login() {
    // base64("AWS:secret")
    let auth = RegistryAuth::from_ecr_token(
        "https://123.dkr.ecr.eu-west-1.amazonaws.com",
        "QVdTOnNlY3JldA==",
    )
    .unwrap();
    assert_eq!(auth.server, "123.dkr.ecr.eu-west-1.amazonaws.com");
    assert_eq!(auth.credentials.username, "AWS");
    assert!(!format!("{auth:?}").contains("secret"));
}

#[test]
fn test_cli_covers_the_usage_listing() {
    for spec in commands::COMMANDS {
        let mut argv = vec!["kim", spec.name];
        if spec.args == "INSTANCE" || spec.args == "COMMAND" {
            argv.push("x");
        }
        let parsed = cli::try_parse_from(argv);
        assert!(parsed.is_ok(), "{} does not parse", spec.name);
    }

    let parsed = cli::try_parse_from(["kim", "exec", "ls /"]).unwrap();
    assert_eq!(parsed.command, Commands::Exec { command: "ls /".into() });
}
