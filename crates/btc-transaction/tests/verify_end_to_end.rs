//! End-to-end verification: build spends, sign them, and run the
//! transaction verifier against the source outputs.

use btc_primitives::ec::PrivateKey;
use btc_primitives::hash::hash160;
use btc_script::interpreter::ScriptFlags;
use btc_script::opcodes::*;
use btc_script::Script;
use btc_transaction::checker::sign_input;
use btc_transaction::sighash;
use btc_transaction::verifier::{InputCheck, OutputMap, TxVerifier};
use btc_transaction::{Transaction, TransactionInput, TransactionOutput};

fn key(n: u32) -> PrivateKey {
    PrivateKey::from_hex(&format!("{:064x}", n)).expect("valid key bytes")
}

fn p2pk_script(pub_key: &[u8]) -> Script {
    let mut script = Script::new();
    script.append_push_data(pub_key).unwrap();
    script.append_opcodes(&[OP_CHECKSIG]).unwrap();
    script
}

fn p2pkh_script(pub_key: &[u8]) -> Script {
    let mut script = Script::new();
    script.append_opcodes(&[OP_DUP, OP_HASH160]).unwrap();
    script.append_push_data(&hash160(pub_key)).unwrap();
    script.append_opcodes(&[OP_EQUALVERIFY, OP_CHECKSIG]).unwrap();
    script
}

fn p2sh_script(redeem: &Script) -> Script {
    let mut script = Script::new();
    script.append_opcodes(&[OP_HASH160]).unwrap();
    script.append_push_data(&hash160(&redeem.to_bytes())).unwrap();
    script.append_opcodes(&[OP_EQUAL]).unwrap();
    script
}

/// A transaction with one input spending `funding_txid:0` and one
/// arbitrary output.
fn spend_template(funding_txid: [u8; 32]) -> Transaction {
    let mut tx = Transaction::new();
    let mut input = TransactionInput::new();
    input.source_txid = funding_txid;
    input.source_index = 0;
    tx.add_input(input);
    tx.add_output(TransactionOutput {
        satoshis: 900,
        locking_script: p2pkh_script(&key(99).pub_key().to_compressed()),
    });
    tx
}

fn lookup_for(funding_txid: [u8; 32], satoshis: u64, locking: &Script) -> OutputMap {
    let mut map = OutputMap::new();
    map.insert(
        funding_txid,
        0,
        TransactionOutput {
            satoshis,
            locking_script: locking.clone(),
        },
    );
    map
}

#[test]
fn verify_p2pk_legacy() {
    let sk = key(1);
    let pub_key = sk.pub_key().to_compressed();
    let locking = p2pk_script(&pub_key);
    let funding_txid = [0x11u8; 32];

    let mut tx = spend_template(funding_txid);
    let flags = ScriptFlags::NONE;
    let full_sig =
        sign_input(&tx, 0, &locking, sighash::SIGHASH_ALL, 1000, flags, &sk).unwrap();

    let mut unlocking = Script::new();
    unlocking.append_push_data(&full_sig).unwrap();
    tx.inputs[0].unlocking_script = Some(unlocking);

    let lookup = lookup_for(funding_txid, 1000, &locking);
    let outcome = TxVerifier::new().verify(&tx, &lookup, flags).unwrap();
    assert!(outcome.valid, "p2pk spend should verify: {:?}", outcome.diagnostics);
    assert!(matches!(outcome.diagnostics[0].result, InputCheck::Valid));
}

#[test]
fn verify_p2pkh_forkid() {
    let sk = key(2);
    let pub_key = sk.pub_key().to_compressed();
    let locking = p2pkh_script(&pub_key);
    let funding_txid = [0x22u8; 32];

    let mut tx = spend_template(funding_txid);
    let flags = ScriptFlags::ENABLE_SIGHASH_FORKID | ScriptFlags::BIP16;
    let full_sig = sign_input(
        &tx,
        0,
        &locking,
        sighash::SIGHASH_ALL_FORKID,
        5000,
        flags,
        &sk,
    )
    .unwrap();

    let mut unlocking = Script::new();
    unlocking.append_push_data(&full_sig).unwrap();
    unlocking.append_push_data(&pub_key).unwrap();
    tx.inputs[0].unlocking_script = Some(unlocking);

    let lookup = lookup_for(funding_txid, 5000, &locking);
    let outcome = TxVerifier::new().verify(&tx, &lookup, flags).unwrap();
    assert!(
        outcome.valid,
        "p2pkh forkid spend should verify: {:?}",
        outcome.diagnostics
    );
}

#[test]
fn verify_p2sh_redeem() {
    let sk = key(3);
    let pub_key = sk.pub_key().to_compressed();
    let redeem = p2pk_script(&pub_key);
    let locking = p2sh_script(&redeem);
    let funding_txid = [0x33u8; 32];

    let mut tx = spend_template(funding_txid);
    let flags = ScriptFlags::BIP16;
    // The digest commits to the redeem script, not the outer p2sh script.
    let full_sig = sign_input(&tx, 0, &redeem, sighash::SIGHASH_ALL, 1000, flags, &sk).unwrap();

    let mut unlocking = Script::new();
    unlocking.append_push_data(&full_sig).unwrap();
    unlocking.append_push_data(&redeem.to_bytes()).unwrap();
    tx.inputs[0].unlocking_script = Some(unlocking);

    let lookup = lookup_for(funding_txid, 1000, &locking);
    let outcome = TxVerifier::new().verify(&tx, &lookup, flags).unwrap();
    assert!(outcome.valid, "p2sh spend should verify: {:?}", outcome.diagnostics);
}

#[test]
fn verify_two_of_three_multisig() {
    let keys = [key(4), key(5), key(6)];
    let pubs: Vec<Vec<u8>> = keys.iter().map(|k| k.pub_key().to_compressed().to_vec()).collect();

    let mut locking = Script::new();
    locking.append_opcodes(&[OP_2]).unwrap();
    for p in &pubs {
        locking.append_push_data(p).unwrap();
    }
    locking.append_opcodes(&[OP_3, OP_CHECKMULTISIG]).unwrap();

    let funding_txid = [0x44u8; 32];
    let mut tx = spend_template(funding_txid);
    let flags = ScriptFlags::STRICT_MULTI_SIG;

    let sig1 = sign_input(&tx, 0, &locking, sighash::SIGHASH_ALL, 1000, flags, &keys[0]).unwrap();
    let sig2 = sign_input(&tx, 0, &locking, sighash::SIGHASH_ALL, 1000, flags, &keys[2]).unwrap();

    // Signatures must appear in key order, after the historical dummy pop.
    let mut unlocking = Script::new();
    unlocking.append_opcodes(&[OP_0]).unwrap();
    unlocking.append_push_data(&sig1).unwrap();
    unlocking.append_push_data(&sig2).unwrap();
    tx.inputs[0].unlocking_script = Some(unlocking);

    let lookup = lookup_for(funding_txid, 1000, &locking);
    let outcome = TxVerifier::new().verify(&tx, &lookup, flags).unwrap();
    assert!(
        outcome.valid,
        "2-of-3 multisig spend should verify: {:?}",
        outcome.diagnostics
    );
}

#[test]
fn verify_multisig_forkid() {
    let keys = [key(4), key(5), key(6)];
    let pubs: Vec<Vec<u8>> = keys.iter().map(|k| k.pub_key().to_compressed().to_vec()).collect();

    let mut locking = Script::new();
    locking.append_opcodes(&[OP_2]).unwrap();
    for p in &pubs {
        locking.append_push_data(p).unwrap();
    }
    locking.append_opcodes(&[OP_3, OP_CHECKMULTISIG]).unwrap();

    let funding_txid = [0x45u8; 32];
    let mut tx = spend_template(funding_txid);
    let flags = ScriptFlags::ENABLE_SIGHASH_FORKID | ScriptFlags::STRICT_MULTI_SIG;

    let sig1 = sign_input(
        &tx,
        0,
        &locking,
        sighash::SIGHASH_ALL_FORKID,
        1000,
        flags,
        &keys[0],
    )
    .unwrap();
    let sig2 = sign_input(
        &tx,
        0,
        &locking,
        sighash::SIGHASH_ALL_FORKID,
        1000,
        flags,
        &keys[2],
    )
    .unwrap();

    let mut unlocking = Script::new();
    unlocking.append_opcodes(&[OP_0]).unwrap();
    unlocking.append_push_data(&sig1).unwrap();
    unlocking.append_push_data(&sig2).unwrap();
    tx.inputs[0].unlocking_script = Some(unlocking);

    let lookup = lookup_for(funding_txid, 1000, &locking);
    let outcome = TxVerifier::new().verify(&tx, &lookup, flags).unwrap();
    assert!(
        outcome.valid,
        "forkid multisig spend should verify: {:?}",
        outcome.diagnostics
    );
}

#[test]
fn verify_multisig_wrong_order_fails() {
    let keys = [key(4), key(5), key(6)];
    let pubs: Vec<Vec<u8>> = keys.iter().map(|k| k.pub_key().to_compressed().to_vec()).collect();

    let mut locking = Script::new();
    locking.append_opcodes(&[OP_2]).unwrap();
    for p in &pubs {
        locking.append_push_data(p).unwrap();
    }
    locking.append_opcodes(&[OP_3, OP_CHECKMULTISIG]).unwrap();

    let funding_txid = [0x44u8; 32];
    let mut tx = spend_template(funding_txid);
    let flags = ScriptFlags::NONE;

    let sig1 = sign_input(&tx, 0, &locking, sighash::SIGHASH_ALL, 1000, flags, &keys[0]).unwrap();
    let sig2 = sign_input(&tx, 0, &locking, sighash::SIGHASH_ALL, 1000, flags, &keys[2]).unwrap();

    // Reversed relative to key order: the greedy match cannot succeed.
    let mut unlocking = Script::new();
    unlocking.append_opcodes(&[OP_0]).unwrap();
    unlocking.append_push_data(&sig2).unwrap();
    unlocking.append_push_data(&sig1).unwrap();
    tx.inputs[0].unlocking_script = Some(unlocking);

    let lookup = lookup_for(funding_txid, 1000, &locking);
    let outcome = TxVerifier::new().verify(&tx, &lookup, flags).unwrap();
    assert!(!outcome.valid, "out-of-order signatures must not verify");
}

#[test]
fn verify_wrong_key_fails() {
    let sk = key(7);
    let wrong = key(8);
    let locking = p2pk_script(&sk.pub_key().to_compressed());
    let funding_txid = [0x55u8; 32];

    let mut tx = spend_template(funding_txid);
    let flags = ScriptFlags::NONE;
    let full_sig =
        sign_input(&tx, 0, &locking, sighash::SIGHASH_ALL, 1000, flags, &wrong).unwrap();

    let mut unlocking = Script::new();
    unlocking.append_push_data(&full_sig).unwrap();
    tx.inputs[0].unlocking_script = Some(unlocking);

    let lookup = lookup_for(funding_txid, 1000, &locking);
    let outcome = TxVerifier::new().verify(&tx, &lookup, flags).unwrap();
    assert!(!outcome.valid, "wrong-key signature must not verify");
    assert!(matches!(
        outcome.diagnostics[0].result,
        InputCheck::ScriptFailure(_)
    ));
}

#[test]
fn verify_corrupted_signature_fails() {
    let sk = key(9);
    let locking = p2pk_script(&sk.pub_key().to_compressed());
    let funding_txid = [0x56u8; 32];

    let mut tx = spend_template(funding_txid);
    let flags = ScriptFlags::NONE;
    let mut full_sig =
        sign_input(&tx, 0, &locking, sighash::SIGHASH_ALL, 1000, flags, &sk).unwrap();

    // Flip one bit in the middle of the DER body, away from the
    // trailing sighash-type byte.
    let mid = full_sig.len() / 2;
    full_sig[mid] ^= 0x01;

    let mut unlocking = Script::new();
    unlocking.append_push_data(&full_sig).unwrap();
    tx.inputs[0].unlocking_script = Some(unlocking);

    let lookup = lookup_for(funding_txid, 1000, &locking);
    let outcome = TxVerifier::new().verify(&tx, &lookup, flags).unwrap();
    assert!(!outcome.valid, "corrupted signature must not verify");
    assert!(matches!(
        outcome.diagnostics[0].result,
        InputCheck::ScriptFailure(_)
    ));
}

#[test]
fn verify_missing_output() {
    let funding_txid = [0x66u8; 32];
    let mut tx = spend_template(funding_txid);
    tx.inputs[0].unlocking_script = Some(Script::new());

    let empty = OutputMap::new();
    let outcome = TxVerifier::new()
        .verify(&tx, &empty, ScriptFlags::NONE)
        .unwrap();
    assert!(!outcome.valid);
    assert!(matches!(
        outcome.diagnostics[0].result,
        InputCheck::NoSuchOutput
    ));
}

#[test]
fn structural_checks() {
    let verifier = TxVerifier::new();
    let lookup = OutputMap::new();

    // No inputs.
    let mut tx = Transaction::new();
    tx.add_output(TransactionOutput {
        satoshis: 1,
        locking_script: Script::new(),
    });
    assert!(verifier.verify(&tx, &lookup, ScriptFlags::NONE).is_err());

    // No outputs.
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::new());
    assert!(verifier.verify(&tx, &lookup, ScriptFlags::NONE).is_err());

    // Duplicate outpoints.
    let mut tx = spend_template([0x77u8; 32]);
    let dup = tx.inputs[0].clone();
    tx.add_input(dup);
    assert!(verifier.verify(&tx, &lookup, ScriptFlags::NONE).is_err());

    // Output value out of range.
    let mut tx = spend_template([0x78u8; 32]);
    tx.outputs[0].satoshis = btc_transaction::verifier::MAX_MONEY + 1;
    assert!(verifier.verify(&tx, &lookup, ScriptFlags::NONE).is_err());
}

/// Null (coinbase) inputs are skipped rather than script-checked.
#[test]
fn verify_skips_coinbase_input() {
    let mut tx = Transaction::new();
    let mut input = TransactionInput::new();
    input.source_index = 0xFFFF_FFFF;
    input.unlocking_script = Some(Script::from_bytes(&[0x03, 0x01, 0x02, 0x03]));
    tx.add_input(input);
    tx.add_output(TransactionOutput {
        satoshis: 5_000_000_000,
        locking_script: p2pkh_script(&key(10).pub_key().to_compressed()),
    });

    let lookup = OutputMap::new();
    let outcome = TxVerifier::new()
        .verify(&tx, &lookup, ScriptFlags::NONE)
        .unwrap();
    assert!(outcome.valid, "coinbase-only tx should pass");
    assert!(matches!(
        outcome.diagnostics[0].result,
        InputCheck::SkippedNull
    ));
}
