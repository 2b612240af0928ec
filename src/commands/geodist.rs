use crate::commands::command_error::CommandError;
use crate::commands::geo_utils::{decode_score, haversine_distance, unit_to_meters};
use crate::key_value_store::{get_live, DataType, KeyValueStore};
use crate::resp::RespValue;

/// `GEODIST key member1 member2 [unit]`: great-circle distance between the
/// two members' decoded positions, rendered with four decimal places in the
/// requested unit (meters by default). Null when either member is absent.
pub fn geodist(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    if arguments.len() != 3 && arguments.len() != 4 {
        return Err(CommandError::WrongNumberOfArguments("geodist".to_string()));
    }

    let unit_factor = unit_to_meters(arguments.get(3).map_or("m", |unit| unit.as_str()))?;

    let Some(value) = get_live(store, &arguments[0]) else {
        return Ok(RespValue::NullBulkString.encode());
    };

    let DataType::SortedSet(set) = &value.data else {
        return Err(CommandError::WrongType);
    };

    let (Some(score1), Some(score2)) = (set.score(&arguments[1]), set.score(&arguments[2]))
    else {
        return Ok(RespValue::NullBulkString.encode());
    };

    let (lon1, lat1) = decode_score(score1 as u64);
    let (lon2, lat2) = decode_score(score2 as u64);

    let distance = haversine_distance(lon1, lat1, lon2, lat2) / unit_factor;

    Ok(RespValue::BulkString(format!("{:.4}", distance)).encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::geoadd::geoadd;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn seeded_store() -> KeyValueStore {
        let mut store = KeyValueStore::new();
        geoadd(
            &mut store,
            &args(&[
                "geo",
                "13.361389",
                "38.115556",
                "Palermo",
                "15.087269",
                "37.502669",
                "Catania",
            ]),
        )
        .unwrap();
        store
    }

    fn bulk_payload(response: &str) -> f64 {
        response
            .split("\r\n")
            .nth(1)
            .and_then(|payload| payload.parse::<f64>().ok())
            .expect("bulk float payload")
    }

    #[test]
    fn test_geodist_same_member_is_zero() {
        let mut store = seeded_store();

        let response = geodist(&mut store, &args(&["geo", "Palermo", "Palermo", "km"])).unwrap();

        assert_eq!(response, "$6\r\n0.0000\r\n");
    }

    #[test]
    fn test_geodist_meters_by_default() {
        let mut store = seeded_store();

        let response = geodist(&mut store, &args(&["geo", "Palermo", "Catania"])).unwrap();
        let distance = bulk_payload(&response);

        assert!(
            (166_000.0..167_000.0).contains(&distance),
            "unexpected distance {}",
            distance
        );
    }

    #[test]
    fn test_geodist_unit_conversion() {
        let mut store = seeded_store();

        let meters = bulk_payload(&geodist(&mut store, &args(&["geo", "Palermo", "Catania", "m"])).unwrap());
        let kilometers =
            bulk_payload(&geodist(&mut store, &args(&["geo", "Palermo", "Catania", "km"])).unwrap());
        let miles =
            bulk_payload(&geodist(&mut store, &args(&["geo", "Palermo", "Catania", "mi"])).unwrap());

        assert!((kilometers - meters / 1000.0).abs() < 0.001);
        assert!((miles - meters / 1609.344).abs() < 0.001);
    }

    #[test]
    fn test_geodist_missing_member_is_null() {
        let mut store = seeded_store();

        assert_eq!(
            geodist(&mut store, &args(&["geo", "Palermo", "Atlantis"])),
            Ok("$-1\r\n".to_string())
        );
        assert_eq!(
            geodist(&mut store, &args(&["nokey", "a", "b"])),
            Ok("$-1\r\n".to_string())
        );
    }

    #[test]
    fn test_geodist_unknown_unit() {
        let mut store = seeded_store();

        assert_eq!(
            geodist(&mut store, &args(&["geo", "Palermo", "Catania", "yd"])),
            Err(CommandError::InvalidGeoUnit)
        );
    }
}
