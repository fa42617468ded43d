//! Logging endpoint URL construction

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::AppConfig;
use crate::session::Session;

/// Characters left alone by `encodeURI`: unreserved marks plus URI delimiters.
pub const URI_SET: &AsciiSet = &COMPONENT_SET
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'#');

/// Characters left alone by `encodeURIComponent`.
pub const COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Build the logging endpoint for the current config and session.
///
/// Every character is percent-encoded once. Values the caller controls
/// (branch, user id, user data) use the component set so an `&` or `=` inside
/// them cannot split the query.
pub fn build_endpoint(config: &AppConfig, session: &Session) -> String {
    let mut url = encode_uri(&config.endpoint);

    push_param(&mut url, '?', "app_id", &encode_uri(&config.app_id.to_uppercase()));
    push_param(&mut url, '&', "app_version", &encode_uri(&config.app_version));
    if let Some(branch) = config.app_branch.as_deref().filter(|b| !b.is_empty()) {
        push_param(&mut url, '&', "appbranch", &encode_component(branch));
    }
    push_param(&mut url, '&', "log_version", &encode_uri(&config.log_version));
    push_param(&mut url, '&', "session_id", &session.id().to_string());
    if let Some(user_id) = session.user_id().filter(|u| !u.is_empty()) {
        push_param(&mut url, '&', "user_id", &encode_component(user_id));
    }
    if let Some(user_data) = session.user_data_string() {
        push_param(&mut url, '&', "user_data", &encode_component(&user_data));
    }

    url
}

fn push_param(url: &mut String, separator: char, name: &str, encoded_value: &str) {
    url.push(separator);
    url.push_str(name);
    url.push('=');
    url.push_str(encoded_value);
}

fn encode_uri(text: &str) -> String {
    utf8_percent_encode(text, URI_SET).to_string()
}

fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT_SET).to_string()
}
