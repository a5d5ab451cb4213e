use ethers_core::types::{Address, U256};
use permit_signer::eip712::{
    hex32_to_uint, is_low_s, recover_address, sign_hash, uint_to_hex32, Eip712Domain,
};
use permit_signer::{checksum_address, parse_address, permit_digest, PermitMessage, PrivateKey};
use proptest::prelude::*;

fn any_private_key() -> impl Strategy<Value = PrivateKey> {
    prop::array::uniform32(any::<u8>()).prop_filter_map("valid secp256k1 scalar", |bytes| {
        PrivateKey::from_bytes(&bytes).ok()
    })
}

fn any_address() -> impl Strategy<Value = Address> {
    prop::array::uniform20(any::<u8>()).prop_map(Address::from)
}

fn stablecoin_domain() -> Eip712Domain {
    Eip712Domain::new(
        "Stablecoin",
        "1",
        99,
        parse_address("0x11Ee1eeF5D446D07Cf26941C7F2B4B1Dfb9D030B").expect("contract address"),
    )
}

proptest! {
    #[test]
    fn uint_words_roundtrip(bytes in prop::array::uniform32(any::<u8>())) {
        let value = U256::from_big_endian(&bytes);
        let word = uint_to_hex32(value);

        prop_assert_eq!(word.len(), 66);
        prop_assert_eq!(&word[2..], hex::encode(bytes));
        prop_assert_eq!(hex32_to_uint(&word).expect("decode word"), value);
    }

    #[test]
    fn checksum_addresses_parse_back(address in any_address()) {
        let checksummed = checksum_address(&address);
        prop_assert!(checksummed.starts_with("0x"));
        prop_assert_eq!(checksummed.len(), 42);
        prop_assert_eq!(parse_address(&checksummed).expect("parse checksummed"), address);
        prop_assert_eq!(
            parse_address(&checksummed.to_lowercase()).expect("parse lowercase"),
            address
        );
    }

    #[test]
    fn signing_is_deterministic_and_recoverable(
        key in any_private_key(),
        digest in prop::array::uniform32(any::<u8>()),
    ) {
        let first = sign_hash(&digest, &key).expect("sign");
        let second = sign_hash(&digest, &key).expect("sign again");

        prop_assert_eq!(first, second);
        prop_assert!(first.recovery_id <= 1);
        prop_assert!(is_low_s(&first.s));
        prop_assert_eq!(recover_address(&digest, &first).expect("recover"), key.address());
    }

    #[test]
    fn changing_a_field_changes_the_digest(
        holder in any_address(),
        spender in any_address(),
        nonce in any::<u64>(),
        expiry in any::<u64>(),
        allowed in any::<bool>(),
    ) {
        let domain = stablecoin_domain();
        let base = PermitMessage::new(holder, spender, nonce.into(), expiry.into(), allowed);
        let base_digest = permit_digest(&domain, &base).expect("digest");

        let mut bumped = base.clone();
        bumped.nonce = bumped.nonce + U256::one();
        prop_assert_ne!(permit_digest(&domain, &bumped).expect("digest"), base_digest);

        let mut extended = base.clone();
        extended.expiry = extended.expiry + U256::one();
        prop_assert_ne!(permit_digest(&domain, &extended).expect("digest"), base_digest);

        let mut flipped = base.clone();
        flipped.allowed = !allowed;
        prop_assert_ne!(permit_digest(&domain, &flipped).expect("digest"), base_digest);

        let mut swapped = base.clone();
        swapped.holder = spender;
        swapped.spender = holder;
        if holder != spender {
            prop_assert_ne!(permit_digest(&domain, &swapped).expect("digest"), base_digest);
        }
    }
}
