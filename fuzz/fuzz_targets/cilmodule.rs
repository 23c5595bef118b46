#![no_main]

use cilimage::prelude::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(module) = CilModule::from_mem(data.to_vec(), LoaderOptions::default()) else {
        return;
    };

    let Ok(entries) = module.interface_impls(&GenericParamContext::empty()) else {
        return;
    };
    for entry in entries {
        let _ = entry.interface();
        let _ = entry.class();
        if let Ok(attributes) = entry.custom_attributes() {
            for attribute in attributes.iter() {
                let _ = attribute;
            }
        }
    }
});
