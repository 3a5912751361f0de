//! # Name Validation
//!
//! Validates Azure resource names and name components before any network call.

use crate::config::environment::FirewallRule;
use crate::constants::{NAME_SUFFIX_LEN, STORAGE_ACCOUNT_NAME_MAX_LEN};
use crate::error::FieldIssue;
use regex::Regex;
use std::net::Ipv4Addr;

fn regex(pattern: &str, field: &str) -> Result<Regex, FieldIssue> {
    Regex::new(pattern).map_err(|e| FieldIssue::new(field, format!("failed to compile regex: {e}")))
}

/// Accept a bare GUID or the `/subscriptions/<guid>` form and return the GUID
pub fn normalize_subscription_id(raw: &str, field: &str) -> Result<String, FieldIssue> {
    let trimmed = raw.trim().trim_end_matches('/');
    let candidate = match trimmed.rsplit_once("/subscriptions/") {
        Some((_, id)) => id,
        None => trimmed.strip_prefix("subscriptions/").unwrap_or(trimmed),
    };

    uuid::Uuid::parse_str(candidate)
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| FieldIssue::new(field, format!("'{candidate}' is not a subscription GUID")))
}

/// Resource group: 1-90 chars of alphanumerics, `-`, `_`, `.`, `(`, `)`; no trailing period
pub fn validate_resource_group(name: &str, field: &str) -> Result<(), FieldIssue> {
    let re = regex(r"^[-\w.()]{1,90}$", field)?;
    if !re.is_match(name) || name.ends_with('.') {
        return Err(FieldIssue::new(
            field,
            format!("'{name}' must be 1-90 characters of letters, digits, '-', '_', '.', '(' or ')' and not end with '.'"),
        ));
    }
    Ok(())
}

/// Region short name such as `westus2`
pub fn validate_location(location: &str, field: &str) -> Result<(), FieldIssue> {
    let re = regex(r"^[a-z0-9]+$", field)?;
    if !re.is_match(location) {
        return Err(FieldIssue::new(
            field,
            format!("'{location}' must be a lowercase region name such as westus2"),
        ));
    }
    Ok(())
}

/// Storage account prefix: lowercase alphanumerics, short enough for prefix + suffix <= 24
pub fn validate_storage_prefix(prefix: &str, field: &str) -> Result<(), FieldIssue> {
    let re = regex(r"^[a-z0-9]+$", field)?;
    let max = STORAGE_ACCOUNT_NAME_MAX_LEN - NAME_SUFFIX_LEN;
    if !re.is_match(prefix) || prefix.len() > max {
        return Err(FieldIssue::new(
            field,
            format!("'{prefix}' must be 1-{max} lowercase letters or digits"),
        ));
    }
    Ok(())
}

/// SQL server / Data Factory prefix: lowercase alphanumerics and hyphens, leading alphanumeric
pub fn validate_dns_prefix(prefix: &str, field: &str) -> Result<(), FieldIssue> {
    let re = regex(r"^[a-z0-9][a-z0-9-]*$", field)?;
    let max = 63 - NAME_SUFFIX_LEN;
    if !re.is_match(prefix) || prefix.len() > max || prefix.contains("--") {
        return Err(FieldIssue::new(
            field,
            format!("'{prefix}' must be 1-{max} lowercase letters, digits or single hyphens"),
        ));
    }
    Ok(())
}

/// Operator pinned suffix: 1-8 lowercase alphanumerics
pub fn validate_name_suffix(suffix: &str, field: &str) -> Result<(), FieldIssue> {
    let re = regex(r"^[a-z0-9]+$", field)?;
    if !re.is_match(suffix) || suffix.len() > NAME_SUFFIX_LEN {
        return Err(FieldIssue::new(
            field,
            format!("'{suffix}' must be 1-{NAME_SUFFIX_LEN} lowercase letters or digits"),
        ));
    }
    Ok(())
}

/// Blob container: 3-63 chars, lowercase alphanumerics and single hyphens, alphanumeric ends
pub fn validate_container_name(name: &str, field: &str) -> Result<(), FieldIssue> {
    let re = regex(r"^[a-z0-9][a-z0-9-]{1,61}[a-z0-9]$", field)?;
    if !re.is_match(name) || name.contains("--") {
        return Err(FieldIssue::new(
            field,
            format!("'{name}' is not a valid blob container name"),
        ));
    }
    Ok(())
}

/// Database name: 1-128 chars, no `<>*%&:\/?` and no trailing period or space
pub fn validate_database_name(name: &str, field: &str) -> Result<(), FieldIssue> {
    let forbidden = ['<', '>', '*', '%', '&', ':', '\\', '/', '?'];
    if name.is_empty()
        || name.len() > 128
        || name.contains(forbidden)
        || name.ends_with('.')
        || name.ends_with(' ')
    {
        return Err(FieldIssue::new(
            field,
            format!("'{name}' is not a valid SQL database name"),
        ));
    }
    Ok(())
}

/// Parse a firewall allow-list of the form `Name:start-end[,Name:start-end...]`
pub fn parse_firewall_rules(raw: &str, field: &str) -> Result<Vec<FirewallRule>, FieldIssue> {
    let name_re = regex(r"^[A-Za-z0-9_-]{1,128}$", field)?;
    let mut rules = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let invalid = || {
            FieldIssue::new(
                field,
                format!("'{entry}' must look like Name:0.0.0.0-255.255.255.255"),
            )
        };
        let (name, range) = entry.split_once(':').ok_or_else(invalid)?;
        let (start, end) = range.split_once('-').ok_or_else(invalid)?;
        let start: Ipv4Addr = start.trim().parse().map_err(|_| invalid())?;
        let end: Ipv4Addr = end.trim().parse().map_err(|_| invalid())?;

        if !name_re.is_match(name.trim()) {
            return Err(FieldIssue::new(
                field,
                format!("firewall rule name '{name}' may only contain letters, digits, '-' and '_'"),
            ));
        }
        if start > end {
            return Err(FieldIssue::new(
                field,
                format!("firewall rule '{name}' starts after it ends ({start} > {end})"),
            ));
        }
        if rules.iter().any(|r: &FirewallRule| r.name == name.trim()) {
            return Err(FieldIssue::new(
                field,
                format!("firewall rule '{name}' is listed twice"),
            ));
        }

        rules.push(FirewallRule {
            name: name.trim().to_string(),
            start,
            end,
        });
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: &str = "FIELD";

    #[test]
    fn test_subscription_id_forms() {
        let guid = "0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0";
        assert_eq!(normalize_subscription_id(guid, FIELD).unwrap(), guid);
        assert_eq!(
            normalize_subscription_id(&format!("/subscriptions/{guid}"), FIELD).unwrap(),
            guid
        );
        assert_eq!(
            normalize_subscription_id(&format!("subscriptions/{guid}/"), FIELD).unwrap(),
            guid
        );
        assert!(normalize_subscription_id("not-a-guid", FIELD).is_err());
    }

    #[test]
    fn test_storage_prefix_leaves_room_for_suffix() {
        assert!(validate_storage_prefix("scasa", FIELD).is_ok());
        assert!(validate_storage_prefix("abcdefghijklmnop", FIELD).is_ok()); // 16
        assert!(validate_storage_prefix("abcdefghijklmnopq", FIELD).is_err()); // 17
        assert!(validate_storage_prefix("Sca", FIELD).is_err());
        assert!(validate_storage_prefix("sca-sa", FIELD).is_err());
    }

    #[test]
    fn test_container_names() {
        assert!(validate_container_name("supply-chain-master-data", FIELD).is_ok());
        assert!(validate_container_name("raw", FIELD).is_ok());
        assert!(validate_container_name("ab", FIELD).is_err());
        assert!(validate_container_name("double--hyphen", FIELD).is_err());
        assert!(validate_container_name("-leading", FIELD).is_err());
        assert!(validate_container_name("Upper", FIELD).is_err());
    }

    #[test]
    fn test_firewall_rules_parse() {
        let rules =
            parse_firewall_rules("AllowAzure:0.0.0.0-0.0.0.0, Office:10.0.0.1-10.0.0.255", FIELD)
                .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].name, "Office");
        assert_eq!(rules[1].start, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(rules[1].end, Ipv4Addr::new(10, 0, 0, 255));

        assert!(parse_firewall_rules("", FIELD).unwrap().is_empty());
        assert!(parse_firewall_rules("NoRange", FIELD).is_err());
        assert!(parse_firewall_rules("Bad:10.0.0.9-10.0.0.1", FIELD).is_err());
        assert!(parse_firewall_rules("Dup:1.1.1.1-1.1.1.1,Dup:2.2.2.2-2.2.2.2", FIELD).is_err());
        assert!(parse_firewall_rules("Ip6:::1-::2", FIELD).is_err());
    }

    #[test]
    fn test_resource_group_rules() {
        assert!(validate_resource_group("sca-rg-dev", FIELD).is_ok());
        assert!(validate_resource_group("rg.(prod)_1", FIELD).is_ok());
        assert!(validate_resource_group("trailing.", FIELD).is_err());
        assert!(validate_resource_group("has space", FIELD).is_err());
        assert!(validate_resource_group("", FIELD).is_err());
    }
}
