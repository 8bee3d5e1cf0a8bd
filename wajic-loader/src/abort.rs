//! The `abort` function: sets the process-wide `STOP` sentinel,
//! invokes the handshake's `error` sink, then throws. Shims do not check
//! `STOP` before running — a later call is serviced normally, but the
//! outer promise chain re-throws the sentinel string so boot does not
//! proceed past the first failure.

pub fn emit(out: &mut String) {
    out.push_str(
        "function abort(code, msg) {\n\
         \x20 STOP = true;\n\
         \x20 WA.error(code, msg);\n\
         \x20 throw 'abort';\n\
         }\n\
         WA.abort = abort;\n",
    );
}
