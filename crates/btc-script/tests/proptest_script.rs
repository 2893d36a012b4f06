use proptest::prelude::*;

use btc_script::interpreter::ScriptNumber;
use btc_script::Script;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn script_number_encode_decode_roundtrip(val in -0x7FFFFFFFi64..=0x7FFFFFFFi64) {
        let sn = ScriptNumber::new(val);
        let bytes = sn.to_bytes();
        let sn2 = ScriptNumber::from_bytes(&bytes, 4, false).unwrap();
        prop_assert_eq!(sn.val, sn2.val);
    }

    #[test]
    fn script_bytes_roundtrip(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let script = Script::from_bytes(&data);
        let out = script.to_bytes();
        prop_assert_eq!(&data[..], out);
    }

    #[test]
    fn script_hex_roundtrip(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let script = Script::from_bytes(&data);
        let hex_str = script.to_hex();
        let script2 = Script::from_hex(&hex_str).unwrap();
        prop_assert_eq!(script.to_bytes(), script2.to_bytes());
    }

    #[test]
    fn script_asm_roundtrip_on_push_data(data in prop::collection::vec(any::<u8>(), 1..75)) {
        let mut script = Script::new();
        script.append_push_data(&data).unwrap();
        let asm = script.to_asm();
        let script2 = Script::from_asm(&asm).unwrap();
        prop_assert_eq!(script.to_bytes(), script2.to_bytes());
    }
}
