//! Error reporting through `tracing`.

use std::error::Error;

use tracing::error;

/// Every layer of an error's `source()` chain, outermost first.
pub fn error_chain(err: &(dyn Error + 'static)) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain
}

/// Log an error and each of its causes at `error` level.
pub fn report_error(context: &str, err: &(dyn Error + 'static)) {
    for (depth, message) in error_chain(err).iter().enumerate() {
        if depth == 0 {
            error!(context, "{message}");
        } else {
            error!(context, depth, "caused by: {message}");
        }
    }
}
