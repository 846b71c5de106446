//! JSON-RPC 2.0 interface of the Keyward node.
//!
//! One request per line, one response per line, over loopback TCP.
//!
//! | Method                   | Params                      | Result                        |
//! |--------------------------|-----------------------------|-------------------------------|
//! | `status_signup`          | `{password}`                | `{address, pubkey}`           |
//! | `status_login`           | `{address, password}`       | `{address_key_id}`            |
//! | `status_logout`          | none                        | `null`                        |
//! | `status_selectedAccount` | none                        | `{address, pubkey, key_id}`   |
//! | `shh_hasKeyPair`         | `["<hex key id or pubkey>"]`| `bool`                        |
//! | `node_status`            | none                        | `{state, selected_address, …}`|
//! | `node_restart`           | none                        | `null`                        |

pub mod client;
pub mod config;
pub mod handler;
pub mod server;
pub mod types;
