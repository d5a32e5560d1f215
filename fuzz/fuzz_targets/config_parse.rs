#![no_main]

use conveyor_core::config::ConveyorConfig;
use conveyor_log_stream::ReaderConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        if let Ok(config) = ConveyorConfig::parse(content) {
            let _ = config.validate();
            let _ = ReaderConfig::from_core(&config.log_stream);
        }
    }
});
