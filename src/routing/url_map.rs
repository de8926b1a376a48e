// ABOUTME: Reads and edits the path prefix rewrite of one path matcher in a url-map document.
// ABOUTME: Works on the YAML form exported by gcloud; JSON parses as YAML too.

use serde_yaml::{Mapping, Value};

use super::error::RoutingError;

const PATH_MATCHERS: &str = "pathMatchers";

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

fn find_matcher<'a>(doc: &'a Value, matcher: &str) -> Option<&'a Value> {
    doc.get(PATH_MATCHERS)?
        .as_sequence()?
        .iter()
        .find(|m| m.get("name").and_then(Value::as_str) == Some(matcher))
}

/// Current `pathPrefixRewrite` of the matcher's default route action.
///
/// `Ok(None)` means the matcher exists but has no rewrite configured.
pub fn path_rewrite(doc: &Value, url_map: &str, matcher: &str) -> Result<Option<String>, RoutingError> {
    let entry = find_matcher(doc, matcher).ok_or_else(|| RoutingError::MatcherNotFound {
        url_map: url_map.to_string(),
        matcher: matcher.to_string(),
    })?;

    Ok(entry
        .get("defaultRouteAction")
        .and_then(|a| a.get("urlRewrite"))
        .and_then(|r| r.get("pathPrefixRewrite"))
        .and_then(Value::as_str)
        .map(str::to_string))
}

/// Set the matcher's `defaultRouteAction.urlRewrite.pathPrefixRewrite`, creating
/// intermediate mappings as needed. Everything else in the document is kept.
pub fn set_path_rewrite(
    doc: &mut Value,
    url_map: &str,
    matcher: &str,
    path: &str,
) -> Result<(), RoutingError> {
    let not_found = || RoutingError::MatcherNotFound {
        url_map: url_map.to_string(),
        matcher: matcher.to_string(),
    };

    let entry = doc
        .get_mut(PATH_MATCHERS)
        .and_then(Value::as_sequence_mut)
        .and_then(|seq| {
            seq.iter_mut()
                .find(|m| m.get("name").and_then(Value::as_str) == Some(matcher))
        })
        .and_then(Value::as_mapping_mut)
        .ok_or_else(not_found)?;

    let action = child_mapping(entry, "defaultRouteAction").ok_or_else(not_found)?;
    let rewrite = child_mapping(action, "urlRewrite").ok_or_else(not_found)?;
    rewrite.insert(key("pathPrefixRewrite"), key(path));
    Ok(())
}

/// The mapping stored under `name`, replacing anything that is not a mapping.
fn child_mapping<'a>(parent: &'a mut Mapping, name: &str) -> Option<&'a mut Mapping> {
    if !parent.get(name).is_some_and(Value::is_mapping) {
        parent.insert(key(name), Value::Mapping(Mapping::new()));
    }
    parent.get_mut(name).and_then(Value::as_mapping_mut)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORTED: &str = r#"
name: site-lb
defaultService: https://www.googleapis.com/compute/v1/projects/p/global/backendBuckets/site
hostRules:
- hosts: ['www.example.com']
  pathMatcher: site
pathMatchers:
- name: other
  defaultService: x
- name: site
  defaultService: https://www.googleapis.com/compute/v1/projects/p/global/backendBuckets/site
  defaultRouteAction:
    urlRewrite:
      pathPrefixRewrite: /releases/v1.0.0/
"#;

    #[test]
    fn reads_current_rewrite() {
        let doc: Value = serde_yaml::from_str(EXPORTED).unwrap();
        assert_eq!(
            path_rewrite(&doc, "site-lb", "site").unwrap().as_deref(),
            Some("/releases/v1.0.0/")
        );
        assert_eq!(path_rewrite(&doc, "site-lb", "other").unwrap(), None);
    }

    #[test]
    fn reads_json_describe_output() {
        let json = r#"{"name":"lb","pathMatchers":[{"name":"m","defaultRouteAction":{"urlRewrite":{"pathPrefixRewrite":"/releases/v2/"}}}]}"#;
        let doc: Value = serde_yaml::from_str(json).unwrap();
        assert_eq!(
            path_rewrite(&doc, "lb", "m").unwrap().as_deref(),
            Some("/releases/v2/")
        );
    }

    #[test]
    fn missing_matcher_is_an_error() {
        let doc: Value = serde_yaml::from_str(EXPORTED).unwrap();
        assert!(matches!(
            path_rewrite(&doc, "site-lb", "nope"),
            Err(RoutingError::MatcherNotFound { .. })
        ));
    }

    #[test]
    fn updates_existing_rewrite_and_keeps_the_rest() {
        let mut doc: Value = serde_yaml::from_str(EXPORTED).unwrap();
        set_path_rewrite(&mut doc, "site-lb", "site", "/releases/v0.9.0/").unwrap();

        assert_eq!(
            path_rewrite(&doc, "site-lb", "site").unwrap().as_deref(),
            Some("/releases/v0.9.0/")
        );
        assert_eq!(doc["name"].as_str(), Some("site-lb"));
        assert_eq!(doc["pathMatchers"][0]["defaultService"].as_str(), Some("x"));
    }

    #[test]
    fn creates_route_action_when_absent() {
        let mut doc: Value = serde_yaml::from_str(EXPORTED).unwrap();
        set_path_rewrite(&mut doc, "site-lb", "other", "/releases/v1/").unwrap();
        assert_eq!(
            path_rewrite(&doc, "site-lb", "other").unwrap().as_deref(),
            Some("/releases/v1/")
        );
    }
}
