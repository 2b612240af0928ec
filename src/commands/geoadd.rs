use crate::commands::command_error::CommandError;
use crate::commands::geo_utils::{coordinates_in_range, encode_score};
use crate::key_value_store::{get_live, DataType, KeyValueStore, SortedSet, Value};
use crate::resp::RespValue;

pub struct GeoaddArguments {
    key: String,
    entries: Vec<(f64, f64, String)>,
}

impl GeoaddArguments {
    /// `GEOADD key longitude latitude member [longitude latitude member
    /// ...]`. Coordinates outside the Mercator-projectable range are
    /// rejected before anything is stored.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() < 4 || (arguments.len() - 1) % 3 != 0 {
            return Err(CommandError::WrongNumberOfArguments("geoadd".to_string()));
        }

        let entries = arguments[1..]
            .chunks(3)
            .map(|chunk| {
                let longitude = chunk[0]
                    .parse::<f64>()
                    .map_err(|_| CommandError::NotAFloat)?;
                let latitude = chunk[1]
                    .parse::<f64>()
                    .map_err(|_| CommandError::NotAFloat)?;

                if !coordinates_in_range(longitude, latitude) {
                    return Err(CommandError::InvalidCoordinates(longitude, latitude));
                }

                Ok((longitude, latitude, chunk[2].clone()))
            })
            .collect::<Result<Vec<(f64, f64, String)>, CommandError>>()?;

        Ok(Self {
            key: arguments[0].clone(),
            entries,
        })
    }
}

/// GEOADD stores each member in the sorted set under its Morton score; the
/// reply counts newly added members, exactly like ZADD.
pub fn geoadd(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let args = GeoaddArguments::parse(arguments)?;

    let _ = get_live(store, &args.key);

    let value = store
        .entry(args.key.clone())
        .or_insert_with(|| Value::new(DataType::SortedSet(SortedSet::new())));

    let DataType::SortedSet(set) = &mut value.data else {
        return Err(CommandError::WrongType);
    };

    let mut newly_added = 0;

    for (longitude, latitude, member) in args.entries {
        if set.insert(member, encode_score(longitude, latitude) as f64) {
            newly_added += 1;
        }
    }

    Ok(RespValue::Integer(newly_added).encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_geoadd_counts_new_members() {
        let mut store = KeyValueStore::new();

        let response = geoadd(
            &mut store,
            &args(&["geo", "13.361389", "38.115556", "Palermo"]),
        )
        .unwrap();
        assert_eq!(response, ":1\r\n");

        // same member again: update, not an addition
        let response = geoadd(
            &mut store,
            &args(&["geo", "13.4", "38.2", "Palermo"]),
        )
        .unwrap();
        assert_eq!(response, ":0\r\n");
    }

    #[test]
    fn test_geoadd_multiple_members() {
        let mut store = KeyValueStore::new();

        let response = geoadd(
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

        assert_eq!(response, ":2\r\n");
    }

    #[test]
    fn test_geoadd_rejects_out_of_range_coordinates() {
        let test_cases = vec![
            args(&["geo", "181", "0", "m"]),
            args(&["geo", "-181", "0", "m"]),
            args(&["geo", "0", "86", "m"]),
            args(&["geo", "0", "-86", "m"]),
        ];

        for input in test_cases {
            let mut store = KeyValueStore::new();
            let result = geoadd(&mut store, &input);

            assert!(
                matches!(result, Err(CommandError::InvalidCoordinates(_, _))),
                "coordinates {:?} accepted",
                input
            );
            assert!(store.is_empty());
        }
    }

    #[test]
    fn test_geoadd_rejects_non_numeric_coordinates() {
        let mut store = KeyValueStore::new();

        assert_eq!(
            geoadd(&mut store, &args(&["geo", "east", "38", "m"])),
            Err(CommandError::NotAFloat)
        );
    }
}
