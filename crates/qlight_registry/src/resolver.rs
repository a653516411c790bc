//! LAN controller discovery
//!
//! Matches a requesting client to a controller that is probably on the same local
//! network: both must share the public IP, and their private IPs must agree on the
//! first three dot-separated octets. The first eligible controller found wins; scan
//! order over the registry is unspecified.

use qlight_common::{qualify_query, QueryRejection};

use crate::models::DeviceRecord;

/// Outcome of a discovery scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A controller on the requester's subnet; carries its last private IP.
    Matched(String),
    /// Controllers share the requester's public IP, but none is on its subnet.
    NotFound,
    /// No controller has checked in from the requester's public IP.
    NoControllerOnPublicIp,
}

impl Resolution {
    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Matched(_))
    }
}

/// The first three octets of a dotted address, or `None` when there are fewer than
/// three non-empty ones.
pub fn subnet_prefix(ip: &str) -> Option<[&str; 3]> {
    let mut octets = ip.split('.');
    let mut prefix = [""; 3];
    for slot in prefix.iter_mut() {
        match octets.next() {
            Some(octet) if !octet.is_empty() => *slot = octet,
            _ => return None,
        }
    }
    Some(prefix)
}

/// Whether two addresses agree on their first three octets. Malformed input never matches.
pub fn same_subnet(a: &str, b: &str) -> bool {
    match (subnet_prefix(a), subnet_prefix(b)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Scan `records` for a controller on the requester's LAN.
///
/// The private IP is checked against the query validation contract before any scan.
pub fn resolve<'a, I>(
    records: I,
    requester_public_ip: &str,
    requester_private_ip: &str,
) -> Result<Resolution, QueryRejection>
where
    I: IntoIterator<Item = &'a DeviceRecord>,
{
    qualify_query(requester_private_ip)?;

    let mut shares_public_ip = false;
    for candidate in records {
        if !candidate.mode.is_controller() || candidate.last_public_ip != requester_public_ip {
            continue;
        }
        shares_public_ip = true;
        if same_subnet(requester_private_ip, &candidate.last_private_ip) {
            return Ok(Resolution::Matched(candidate.last_private_ip.clone()));
        }
    }

    Ok(if shares_public_ip {
        Resolution::NotFound
    } else {
        Resolution::NoControllerOnPublicIp
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{now_utc, CheckIn, DeviceMode};
    use proptest::prelude::*;

    fn device(id: &str, mode: DeviceMode, public_ip: &str, private_ip: &str) -> DeviceRecord {
        DeviceRecord::first_check_in(
            CheckIn {
                id: id.to_string(),
                mode,
                public_ip: public_ip.to_string(),
                private_ip: private_ip.to_string(),
                ..CheckIn::default()
            },
            now_utc(),
        )
    }

    #[test]
    fn test_subnet_prefix() {
        assert_eq!(subnet_prefix("192.168.1.5"), Some(["192", "168", "1"]));
        assert_eq!(subnet_prefix("10.0.0"), Some(["10", "0", "0"]));
        assert_eq!(subnet_prefix("10.0"), None);
        assert_eq!(subnet_prefix("10..0.1"), None);
        assert_eq!(subnet_prefix(""), None);
    }

    #[test]
    fn test_matches_controller_on_same_subnet() {
        let records = vec![
            device("dev1", DeviceMode::ClientSmartphone, "1.2.3.4", "192.168.1.5"),
            device("ctrl1", DeviceMode::ControllerPro, "1.2.3.4", "192.168.1.9"),
        ];

        let resolution = resolve(&records, "1.2.3.4", "192.168.1.5").unwrap();

        assert_eq!(resolution, Resolution::Matched("192.168.1.9".to_string()));
    }

    #[test]
    fn test_different_subnet_is_not_found() {
        let records = vec![device("ctrl1", DeviceMode::ControllerLite, "1.2.3.4", "192.168.1.9")];

        let resolution = resolve(&records, "1.2.3.4", "10.0.0.5").unwrap();

        assert_eq!(resolution, Resolution::NotFound);
    }

    #[test]
    fn test_different_public_ip_has_no_controller() {
        let records = vec![device("ctrl1", DeviceMode::ControllerPro, "9.9.9.9", "192.168.1.9")];

        let resolution = resolve(&records, "1.2.3.4", "192.168.1.5").unwrap();

        assert_eq!(resolution, Resolution::NoControllerOnPublicIp);
    }

    #[test]
    fn test_ignores_non_controllers() {
        let modes = [
            DeviceMode::ClientSmartphone,
            DeviceMode::ClientComputer,
            DeviceMode::ClientIot,
            DeviceMode::UnsetSmartphone,
            DeviceMode::UnsetComputer,
            DeviceMode::Unset,
        ];
        let records: Vec<_> = modes
            .iter()
            .enumerate()
            .map(|(i, mode)| device(&format!("d{i}"), *mode, "1.2.3.4", "192.168.1.9"))
            .collect();

        let resolution = resolve(&records, "1.2.3.4", "192.168.1.5").unwrap();

        assert_eq!(resolution, Resolution::NoControllerOnPublicIp);
    }

    #[test]
    fn test_malformed_addresses_never_match() {
        let records = vec![
            device("ctrl1", DeviceMode::ControllerPro, "1.2.3.4", "192.168"),
            device("ctrl2", DeviceMode::ControllerPro, "1.2.3.4", ""),
        ];

        assert_eq!(
            resolve(&records, "1.2.3.4", "192.168.1.5").unwrap(),
            Resolution::NotFound
        );
        assert_eq!(
            resolve(&records, "1.2.3.4", "192.168").unwrap(),
            Resolution::NotFound
        );
    }

    #[test]
    fn test_rejects_invalid_private_ip_before_scanning() {
        let records = vec![device("ctrl1", DeviceMode::ControllerPro, "1.2.3.4", "192.168.1.9")];

        assert_eq!(resolve(&records, "1.2.3.4", ""), Err(QueryRejection::Empty));
        assert_eq!(
            resolve(&records, "1.2.3.4", "192.168.1.5;"),
            Err(QueryRejection::IllegalCharacter(';'))
        );
        assert_eq!(
            resolve(&records, "1.2.3.4", &"1".repeat(300)),
            Err(QueryRejection::TooLong)
        );
    }

    #[test]
    fn test_first_eligible_controller_wins() {
        let records = vec![
            device("ctrl1", DeviceMode::ControllerPro, "1.2.3.4", "192.168.1.9"),
            device("ctrl2", DeviceMode::ControllerLite, "1.2.3.4", "192.168.1.10"),
        ];

        let resolution = resolve(&records, "1.2.3.4", "192.168.1.5").unwrap();

        assert_eq!(resolution, Resolution::Matched("192.168.1.9".to_string()));
    }

    proptest! {
        #[test]
        fn prop_same_first_three_octets_always_match(
            a in 0u8..=255, b in 0u8..=255, c in 0u8..=255,
            d1 in 0u8..=255, d2 in 0u8..=255,
        ) {
            let left = format!("{a}.{b}.{c}.{d1}");
            let right = format!("{a}.{b}.{c}.{d2}");
            prop_assert!(same_subnet(&left, &right));
            prop_assert!(same_subnet(&right, &left));
        }

        #[test]
        fn prop_any_prefix_difference_never_matches(
            octets in prop::array::uniform3(0u8..=255),
            other in prop::array::uniform3(0u8..=255),
            d1 in 0u8..=255, d2 in 0u8..=255,
        ) {
            prop_assume!(octets != other);
            let left = format!("{}.{}.{}.{d1}", octets[0], octets[1], octets[2]);
            let right = format!("{}.{}.{}.{d2}", other[0], other[1], other[2]);
            prop_assert!(!same_subnet(&left, &right));
        }

        #[test]
        fn prop_non_controllers_are_never_resolved(
            c in 0u8..=255, d in 0u8..=255,
        ) {
            let private_ip = format!("192.168.{c}.{d}");
            let records = vec![device("client", DeviceMode::ClientComputer, "1.2.3.4", &private_ip)];
            let resolution = resolve(&records, "1.2.3.4", &private_ip).unwrap();
            prop_assert_eq!(resolution, Resolution::NoControllerOnPublicIp);
        }
    }
}
