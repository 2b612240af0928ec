pub mod blpop;
pub mod command_dispatcher;
pub mod command_error;
pub mod command_handler;
pub mod config_get;
pub mod echo;
pub mod geo_utils;
pub mod geoadd;
pub mod geodist;
pub mod geopos;
pub mod geosearch;
pub mod get;
pub mod incr;
pub mod info;
pub mod keys;
pub mod llen;
pub mod lpop;
pub mod lrange;
pub mod ping;
pub mod psync;
pub mod pub_sub;
pub mod replconf;
pub mod rpush_and_lpush;
pub mod set;
pub mod stream_utils;
pub mod type_command;
pub mod wait;
pub mod xadd;
pub mod xrange;
pub mod xread;
pub mod zadd;
pub mod zcard;
pub mod zrank;
pub mod zrange;
pub mod zrem;
pub mod zscore;

pub use command_dispatcher::{CommandDispatcher, DispatchResult};
pub use command_error::CommandError;
pub use command_handler::{CommandHandler, CommandResult};
