use super::*;

#[test]
fn test_is_oci() {
    assert!(is_oci("oci://ghcr.io/org/charts"));
    assert!(is_oci("oci://localhost:5000/charts"));
    assert!(!is_oci("https://charts.example.com"));
    assert!(!is_oci("http://oci.example.com"));
    assert!(!is_oci("ghcr.io/org/charts"));
    assert!(!is_oci(""));
}

#[test]
fn test_oci_reference_table() {
    let cases = [
        (
            "oci://ghcr.io/org/charts",
            "mychart",
            "1.0.0",
            "ghcr.io/org/charts/mychart:1.0.0",
        ),
        (
            "oci://ghcr.io/org/charts/mychart",
            "",
            "1.0.0",
            "ghcr.io/org/charts/mychart:1.0.0",
        ),
        (
            "oci://ghcr.io/org/charts/mychart",
            "",
            "",
            "ghcr.io/org/charts/mychart",
        ),
        (
            "oci://docker.io/library/mysql",
            "",
            "8.0",
            "docker.io/library/mysql:8.0",
        ),
        (
            "oci://ghcr.io/org/charts/mychart",
            "mychart",
            "2.0.0",
            "ghcr.io/org/charts/mychart:2.0.0",
        ),
        (
            "oci://ghcr.io/org/charts/",
            "mychart",
            "",
            "ghcr.io/org/charts/mychart",
        ),
    ];

    for (locator, chart, version, expected) in cases {
        assert_eq!(
            oci_reference(locator, chart, version),
            expected,
            "{locator} {chart} {version}"
        );
    }
}

#[test]
fn test_oci_reference_replaces_existing_tag() {
    assert_eq!(
        oci_reference("oci://ghcr.io/org/charts/mychart:1.0.0", "mychart", "2.0.0"),
        "ghcr.io/org/charts/mychart:2.0.0"
    );
    assert_eq!(
        oci_reference("oci://ghcr.io/org/charts/mychart:1.0.0", "", ""),
        "ghcr.io/org/charts/mychart:1.0.0"
    );
}

#[test]
fn test_oci_reference_keeps_registry_port() {
    assert_eq!(
        oci_reference("oci://localhost:5000/charts", "app", "0.1.0"),
        "localhost:5000/charts/app:0.1.0"
    );
    assert_eq!(
        oci_reference("oci://localhost:5000", "app", ""),
        "localhost:5000/app"
    );
}

#[test]
fn test_oci_reference_does_not_match_partial_suffix() {
    // "chart" is a suffix of "mychart" but not a path segment
    assert_eq!(
        oci_reference("oci://ghcr.io/org/mychart", "chart", ""),
        "ghcr.io/org/mychart/chart"
    );
}

#[test]
fn test_chart_name_from_oci_table() {
    let cases = [
        ("oci://ghcr.io/org/charts/mychart", "mychart"),
        ("oci://ghcr.io/org/charts/mychart:1.0.0", "mychart"),
        ("oci://docker.io/library/mysql", "mysql"),
        ("oci://registry.example.com/app", "app"),
        ("oci://localhost:5000/app/", "app"),
    ];

    for (locator, expected) in cases {
        assert_eq!(chart_name_from_oci(locator), expected, "{locator}");
    }
}

#[test]
fn test_chart_name_from_bare_registry() {
    // A locator without a path yields the host itself
    assert_eq!(chart_name_from_oci("oci://ghcr.io"), "ghcr.io");
    assert_eq!(chart_name_from_oci("oci://"), "");
}

#[test]
fn test_reference_accessors() {
    let reference = Reference::from_str("ghcr.io/org/charts/mychart:1.0.0").unwrap();

    assert_eq!(reference.registry(), "ghcr.io");
    assert_eq!(reference.api_host(), "ghcr.io");
    assert_eq!(reference.repository(), "org/charts/mychart");
    assert_eq!(reference.tag(), Some("1.0.0"));
    assert_eq!(reference.digest(), None);
}

#[test]
fn test_reference_docker_hub_api_host() {
    let reference = Reference::from_str("docker.io/bitnamicharts/redis:17.0.0").unwrap();
    assert_eq!(reference.api_host(), "registry-1.docker.io");
    assert_eq!(reference.repository(), "bitnamicharts/redis");
}

#[test]
fn test_reference_from_invalid_string_fails() {
    let reference = Reference::from_str("Invalid-Reference-With-Caps");
    assert!(matches!(reference, Err(ChartexError::Validation { .. })));
}
