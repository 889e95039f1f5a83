use super::*;
use crate::chart::{CHART_YAML, ChartFile, ChartMetadata};
use serde_yaml::Value as Yaml;
use serde_json::json;
use std::path::PathBuf;

fn chart() -> Chart {
    Chart {
        metadata: ChartMetadata::new("web", "0.3.0"),
        raw: vec![ChartFile::new(
            CHART_YAML,
            "apiVersion: v2\nname: web\nversion: 0.3.0\n",
        )],
        dependencies: vec![],
    }
}

#[cfg(unix)]
fn fake_helm(dir: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("helm");
    std::fs::write(&path, format!("#!/bin/sh\n{}", script)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn test_template_args_without_values() {
    let renderer = HelmTemplateRenderer::default();
    let args = renderer.template_args(Path::new("/tmp/web-0.3.0.tgz"), None);

    assert_eq!(
        args,
        vec![
            OsString::from("template"),
            OsString::from("release-name"),
            OsString::from("/tmp/web-0.3.0.tgz"),
            OsString::from("--namespace"),
            OsString::from("default"),
        ]
    );
}

#[test]
fn test_template_args_with_values() {
    let renderer = HelmTemplateRenderer::from_config(&config::Render {
        helm_binary: "helm3".to_string(),
        release_name: "demo".to_string(),
        namespace: "apps".to_string(),
    });
    let args = renderer.template_args(
        Path::new("/tmp/web.tgz"),
        Some(Path::new("/tmp/values.json")),
    );

    assert_eq!(args[1], OsString::from("demo"));
    assert_eq!(args[4], OsString::from("apps"));
    assert_eq!(&args[5..], &[OsString::from("--values"), OsString::from("/tmp/values.json")]);
}

#[test]
fn test_has_overrides() {
    assert!(!has_overrides(&Value::Null));
    assert!(!has_overrides(&json!({})));
    assert!(has_overrides(&json!({"image": {"tag": "1.0"}})));
    assert!(has_overrides(&json!([1, 2])));
}

#[tokio::test]
async fn test_render_rejects_non_object_values() {
    let err = HelmTemplateRenderer::default()
        .render(&chart(), &json!(["not", "an", "object"]))
        .await
        .unwrap_err();

    assert!(matches!(err, ChartexError::Validation { .. }));
}

#[tokio::test]
async fn test_render_missing_binary() {
    let renderer =
        HelmTemplateRenderer::default().with_helm_binary("/nonexistent/chartex-helm-binary");
    let err = renderer.render(&chart(), &Value::Null).await.unwrap_err();

    assert!(matches!(err, ChartexError::Render { ref chart, .. } if chart == "web"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_render_returns_helm_output() {
    let dir = tempfile::tempdir().unwrap();
    let helm = fake_helm(
        dir.path(),
        r##"echo "# args: $1 $2 $4 $5"
echo "---"
echo "kind: Pod"
echo "metadata:"
echo "  name: web"
echo "spec:"
echo "  containers:"
echo "  - image: nginx:1.25"
"##,
    );

    let renderer = HelmTemplateRenderer::default().with_helm_binary(helm.to_string_lossy());
    let output = renderer.render(&chart(), &Value::Null).await.unwrap();

    assert_eq!(output.len(), 1);
    assert!(output[0].starts_with("# args: template release-name --namespace default"));
    assert!(output[0].contains("image: nginx:1.25"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_render_passes_values_file() {
    let dir = tempfile::tempdir().unwrap();
    // Prints the content of the file following --values
    let helm = fake_helm(
        dir.path(),
        r#"while [ $# -gt 0 ]; do
  if [ "$1" = "--values" ]; then cat "$2"; fi
  shift
done
"#,
    );

    let renderer = HelmTemplateRenderer::default().with_helm_binary(helm.to_string_lossy());
    let values = json!({"image": {"tag": "2.0"}});
    let output = renderer.render(&chart(), &values).await.unwrap();

    let written: Value = serde_json::from_str(&output[0]).unwrap();
    assert_eq!(written, values);
}

#[cfg(unix)]
#[tokio::test]
async fn test_render_failure_includes_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let helm = fake_helm(dir.path(), "echo 'Error: parse error in deployment.yaml' >&2\nexit 1\n");

    let renderer = HelmTemplateRenderer::default().with_helm_binary(helm.to_string_lossy());
    let err = renderer.render(&chart(), &Value::Null).await.unwrap_err();

    assert!(matches!(err, ChartexError::Render { .. }));
    assert!(err.to_string().contains("parse error in deployment.yaml"));
}

const APP_CHART_YAML: &str = "apiVersion: v2
name: app
version: 1.0.0
dependencies:
  - name: cache
    version: 1.0.0
    repository: https://charts.example.com
  - name: redis
    version: 17.0.0
    repository: https://charts.bitnami.com/bitnami
";

fn app_with_one_vendored_dependency() -> Chart {
    Chart {
        metadata: ChartMetadata::new("app", "1.0.0"),
        raw: vec![ChartFile::new(CHART_YAML, APP_CHART_YAML)],
        dependencies: vec![Chart {
            metadata: ChartMetadata::new("cache", "1.0.0"),
            raw: vec![ChartFile::new(
                CHART_YAML,
                "apiVersion: v2\nname: cache\nversion: 1.0.0\ndependencies:\n  - name: common\n    version: 2.0.0\n",
            )],
            dependencies: vec![],
        }],
    }
}

fn declared_names(data: &[u8]) -> Vec<String> {
    let document: Yaml = serde_yaml::from_slice(data).unwrap();
    document["dependencies"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_prune_declared_keeps_vendored_by_name_or_alias() {
    let data = b"name: app\ndependencies:\n  - name: postgresql\n    alias: db\n  - name: cache\n  - name: redis\n";
    let pruned = prune_declared(data, &["db", "cache"]).unwrap().unwrap();

    assert_eq!(declared_names(&pruned), vec!["postgresql", "cache"]);
}

#[test]
fn test_prune_declared_leaves_complete_charts_untouched() {
    let data = b"name: app\ndependencies:\n  - name: cache\n";
    assert_eq!(prune_declared(data, &["cache"]).unwrap(), None);
    assert_eq!(prune_declared(b"name: app\n", &[]).unwrap(), None);
}

#[test]
fn test_vendored_only_prunes_every_level() {
    let chart = app_with_one_vendored_dependency();
    let pruned = vendored_only(&chart).unwrap();

    assert_eq!(declared_names(&pruned.file(CHART_YAML).unwrap().data), vec!["cache"]);
    assert!(declared_names(&pruned.dependencies[0].file(CHART_YAML).unwrap().data).is_empty());
    // The loaded chart itself is not modified
    assert_eq!(chart.file(CHART_YAML).unwrap().data, APP_CHART_YAML.as_bytes());
}

#[cfg(unix)]
#[tokio::test]
async fn test_render_packages_only_vendored_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    // Prints the Chart.yaml of the packaged chart passed as third argument
    let helm = fake_helm(dir.path(), "tar -xzOf \"$3\" app/Chart.yaml\n");

    let renderer = HelmTemplateRenderer::default().with_helm_binary(helm.to_string_lossy());
    let output = renderer
        .render(&app_with_one_vendored_dependency(), &Value::Null)
        .await
        .unwrap();

    assert_eq!(declared_names(output[0].as_bytes()), vec!["cache"]);
}
