#[cfg(test)]
#[ctor::ctor]
fn init_test_harness() {
    color_backtrace::install();
    let _ = env_logger::builder().is_test(true).try_init();
}
