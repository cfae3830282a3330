//! Lua scripts for atomic registry tree updates.
//!
//! The registry is stored as one Redis set per tree level. Removing the last
//! endpoint of a service must also remove the service from its application,
//! and the application from the root, without a window where a concurrent
//! reader sees a dangling parent.

/// Remove one endpoint and prune parents left empty.
///
/// Arguments:
/// - KEYS[1]: Root set (`ezDiscovery`)
/// - KEYS[2]: Application set (`ezDiscovery/{app}`)
/// - KEYS[3]: Endpoint set (`ezDiscovery/{app}/{service}/endpoints`)
/// - ARGV[1]: Application name
/// - ARGV[2]: Service name
/// - ARGV[3]: Endpoint (`host:port`)
///
/// Returns:
/// - 1: Endpoint was removed
/// - 0: Endpoint was not registered
pub const REMOVE_ENDPOINT: &str = r#"
local removed = redis.call('SREM', KEYS[3], ARGV[3])

if redis.call('SCARD', KEYS[3]) == 0 then
    redis.call('DEL', KEYS[3])
    redis.call('SREM', KEYS[2], ARGV[2])
end

if redis.call('SCARD', KEYS[2]) == 0 then
    redis.call('DEL', KEYS[2])
    redis.call('SREM', KEYS[1], ARGV[1])
end

return removed
"#;
