use crate::commands::command_error::CommandError;
use crate::key_value_store::{get_live, DataType, KeyValueStore, SortedSet, Value};
use crate::resp::RespValue;

pub struct ZaddArguments {
    key: String,
    pairs: Vec<(f64, String)>,
}

impl ZaddArguments {
    /// `ZADD key score member [score member ...]`. Scores must parse as
    /// floats; infinities are allowed, NaN is not.
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        if arguments.len() < 3 || (arguments.len() - 1) % 2 != 0 {
            return Err(CommandError::WrongNumberOfArguments("zadd".to_string()));
        }

        let pairs = arguments[1..]
            .chunks(2)
            .map(|chunk| {
                let score = chunk[0]
                    .parse::<f64>()
                    .map_err(|_| CommandError::NotAFloat)?;

                if score.is_nan() {
                    return Err(CommandError::NotAFloat);
                }

                Ok((score, chunk[1].clone()))
            })
            .collect::<Result<Vec<(f64, String)>, CommandError>>()?;

        Ok(Self {
            key: arguments[0].clone(),
            pairs,
        })
    }
}

/// ZADD inserts or re-scores members; the reply counts only the members
/// that did not exist before.
pub fn zadd(store: &mut KeyValueStore, arguments: &[String]) -> Result<String, CommandError> {
    let args = ZaddArguments::parse(arguments)?;

    let _ = get_live(store, &args.key);

    let value = store
        .entry(args.key.clone())
        .or_insert_with(|| Value::new(DataType::SortedSet(SortedSet::new())));

    let DataType::SortedSet(set) = &mut value.data else {
        return Err(CommandError::WrongType);
    };

    let mut newly_added = 0;

    for (score, member) in args.pairs {
        if set.insert(member, score) {
            newly_added += 1;
        }
    }

    Ok(RespValue::Integer(newly_added).encode())
}
