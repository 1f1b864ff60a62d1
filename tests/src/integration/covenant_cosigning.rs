//! # Covenant Co-Signing Across Providers
//!
//! A delegation to two finality providers needs adaptor signatures encrypted
//! to *each* provider key on both slashing paths. Signatures covering only
//! one provider count towards nothing for the other.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{fp_address, fp_pk, Harness};
    use node_runtime::RuntimeError;
    use qc_18_btc_staking::test_utils::{
        btc_pk, covenant_batch, covenant_key, keypair, DelegationFixture, FIXTURE_STAKING_TIME,
    };
    use qc_18_btc_staking::{
        BtcStakingApi, CovenantSigOutcome, CovenantSignatureBatch, DelegationStatus, SpendPath,
        StakingError,
    };
    use shared_crypto::SchnorrPublicKey;
    use shared_types::{Address, BtcPublicKey, Hash};

    const FP1: u8 = 1;
    const FP2: u8 = 2;
    const STAKER: Address = Address([0x5A; 20]);
    const STAKER_SEED: u8 = 0x70;

    /// Providers registered and a pending delegation to both.
    fn pending_two_provider_delegation() -> (Harness, DelegationFixture) {
        let mut h = Harness::new(3, 2);
        let fixture = h.fixture(STAKER_SEED, &[FP1, FP2], 500_000);
        h.block(|chain| {
            for seed in [FP1, FP2] {
                chain
                    .register_finality_provider(fp_pk(seed), fp_address(seed), 500)
                    .unwrap();
            }
            chain
                .create_delegation(fixture.create_request(STAKER, 1))
                .unwrap();
        });
        (h, fixture)
    }

    /// Member batch keeping only the adaptor signatures encrypted to `fp`.
    fn batch_for_provider(
        fixture: &DelegationFixture,
        member: usize,
        fp: BtcPublicKey,
    ) -> CovenantSignatureBatch {
        let mut batch = covenant_batch(fixture, member);
        batch.staking_slashing.retain(|(pk, _)| *pk == fp);
        batch.unbonding_slashing.retain(|(pk, _)| *pk == fp);
        batch
    }

    fn status(h: &Harness, hash: &Hash) -> DelegationStatus {
        h.chain
            .snapshot()
            .staking
            .delegation(hash)
            .map(|d| d.status)
            .unwrap()
    }

    fn submit(
        h: &mut Harness,
        batch: CovenantSignatureBatch,
    ) -> Result<CovenantSigOutcome, RuntimeError> {
        h.block(|chain| chain.add_covenant_signatures(batch))
    }

    #[test]
    fn test_quorum_on_one_provider_keeps_pending() {
        let (mut h, fixture) = pending_two_provider_delegation();
        let hash = fixture.staking_tx_hash();

        for member in 0..3 {
            let batch = batch_for_provider(&fixture, member, fp_pk(FP1));
            let outcome = submit(&mut h, batch).unwrap();
            assert!(matches!(outcome, CovenantSigOutcome::Accepted { .. }));
        }
        assert_eq!(status(&h, &hash), DelegationStatus::Pending);

        let snapshot = h.chain.snapshot();
        let sigs = &snapshot.staking.delegation(&hash).unwrap().covenant_sigs;
        assert_eq!(sigs.count(SpendPath::StakingSlashing, &fp_pk(FP1)), 3);
        assert_eq!(sigs.count(SpendPath::StakingSlashing, &fp_pk(FP2)), 0);
    }

    #[test]
    fn test_completing_second_provider_activates() {
        let (mut h, fixture) = pending_two_provider_delegation();
        let hash = fixture.staking_tx_hash();

        for member in 0..2 {
            submit(&mut h, batch_for_provider(&fixture, member, fp_pk(FP1))).unwrap();
        }
        let first = submit(&mut h, batch_for_provider(&fixture, 0, fp_pk(FP2))).unwrap();
        assert!(matches!(first, CovenantSigOutcome::Accepted { .. }));
        assert_eq!(status(&h, &hash), DelegationStatus::Pending);

        let second = submit(&mut h, batch_for_provider(&fixture, 1, fp_pk(FP2))).unwrap();
        assert!(matches!(second, CovenantSigOutcome::Activated { .. }));
        assert_eq!(status(&h, &hash), DelegationStatus::Active);

        // power counts fully towards both providers
        let snapshot = h.chain.snapshot();
        let table = snapshot.voting_power_at(snapshot.height).unwrap();
        assert_eq!(table.finality_provider_power(&fp_pk(FP1)), 500_000);
        assert_eq!(table.finality_provider_power(&fp_pk(FP2)), 500_000);
        assert_eq!(table.delegator_power(&STAKER), 500_000);
    }

    #[test]
    fn test_resubmission_after_activation_is_duplicate() {
        let (mut h, fixture) = pending_two_provider_delegation();
        submit(&mut h, covenant_batch(&fixture, 0)).unwrap();
        submit(&mut h, covenant_batch(&fixture, 1)).unwrap();

        let again = submit(&mut h, covenant_batch(&fixture, 0)).unwrap();
        assert_eq!(again, CovenantSigOutcome::Duplicate);
        let late = submit(&mut h, covenant_batch(&fixture, 2)).unwrap_err();
        assert!(matches!(
            late,
            RuntimeError::Staking(StakingError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_signature_under_wrong_member_key_rejected() {
        let (mut h, fixture) = pending_two_provider_delegation();
        let mut forged = covenant_batch(&fixture, 0);
        forged.covenant_pk = btc_pk(&covenant_key(1));

        let err = submit(&mut h, forged).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Staking(StakingError::InvalidSignature { .. })
        ));
        let snapshot = h.chain.snapshot();
        let sigs = &snapshot
            .staking
            .delegation(&fixture.staking_tx_hash())
            .unwrap()
            .covenant_sigs;
        assert_eq!(sigs.count(SpendPath::Unbonding, &fp_pk(FP1)), 0);
    }

    #[test]
    fn test_outsider_batch_rejected() {
        let (mut h, fixture) = pending_two_provider_delegation();
        let mut outsider = covenant_batch(&fixture, 0);
        outsider.covenant_pk = btc_pk(&covenant_key(7));

        let err = submit(&mut h, outsider).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Staking(StakingError::UnknownCovenantMember { .. })
        ));
    }

    #[test]
    fn test_slashing_signature_reveals_provider_key() {
        let (mut h, fixture) = pending_two_provider_delegation();
        submit(&mut h, covenant_batch(&fixture, 0)).unwrap();

        let member = btc_pk(&covenant_key(0));
        let snapshot = h.chain.snapshot();
        let adaptor = snapshot
            .staking
            .delegation(&fixture.staking_tx_hash())
            .unwrap()
            .covenant_sigs
            .staking_slashing[&fp_pk(FP2)][&member];

        // the provider decrypts to publish the slashing transaction...
        let fp_key = keypair(FP2);
        let signature = adaptor.decrypt(&fp_key).unwrap();
        let member_key = SchnorrPublicKey::from_bytes(member.0).unwrap();
        member_key
            .verify(&fixture.digests.staking_slashing, &signature)
            .unwrap();

        // ...which lets anyone recover the provider's secret key
        let recovered = adaptor.extract(&signature, &fp_key.public_key()).unwrap();
        assert_eq!(recovered.public_key(), fp_key.public_key());
    }

    #[test]
    fn test_undelegate_and_expiry_end_activity() {
        let (mut h, fixture) = pending_two_provider_delegation();
        submit(&mut h, covenant_batch(&fixture, 0)).unwrap();
        submit(&mut h, covenant_batch(&fixture, 1)).unwrap();
        let hash = fixture.staking_tx_hash();

        let second = h.fixture(STAKER_SEED, &[FP1], 200_000);
        let second_hash = second.staking_tx_hash();
        h.block(|chain| {
            chain
                .create_delegation(second.create_request(STAKER, 1))
                .unwrap();
            chain
                .add_covenant_signatures(covenant_batch(&second, 0))
                .unwrap();
            chain
                .add_covenant_signatures(covenant_batch(&second, 2))
                .unwrap();
        });

        h.block(|chain| chain.undelegate(hash, fixture.unbonding_sig()).unwrap());
        assert_eq!(status(&h, &hash), DelegationStatus::Unbonding);

        // both started at BTC height 1; finalization timeout is 10 blocks
        let expiry_tip = 1 + FIXTURE_STAKING_TIME as u64 - 10;
        let expired = h.block(|chain| chain.process_btc_tip(expiry_tip - 1).unwrap());
        assert!(expired.is_empty());
        let expired = h.block(|chain| chain.process_btc_tip(expiry_tip).unwrap());
        assert_eq!(expired, vec![second_hash]);
        assert_eq!(status(&h, &hash), DelegationStatus::Unbonding);

        let snapshot = h.chain.snapshot();
        assert_eq!(
            snapshot
                .voting_power_at(snapshot.height)
                .unwrap()
                .total_power(),
            0
        );
    }
}
